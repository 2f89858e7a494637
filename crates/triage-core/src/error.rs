//! Unified error model for the fact and domain layer
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("DOMAIN/unknown domain '{0}', expected 'Network' or 'Computer'")]
    UnknownDomain(String),

    #[error("FACTS/{0}")]
    InvalidFacts(String),

    #[error("CATALOG/{0}")]
    VariableCatalog(String),
}
