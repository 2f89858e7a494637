//! Engine configuration and case recording errors
use thiserror::Error;

use triage_rules::CatalogError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("CONFIG/cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CONFIG/{0}")]
    Parse(String),

    #[error("CONFIG/{field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("RECORD/io: {0}")]
    Io(#[from] std::io::Error),

    #[error("RECORD/serialize: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("RECORD/unavailable: {0}")]
    Unavailable(String),
}
