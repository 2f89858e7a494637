//! Rule catalog errors
//!
//! Every variant describes an authoring defect. A process that meets one while
//! building its catalog refuses to start.
use thiserror::Error;

use triage_core::Domain;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("PARSE/{0}")]
    Parse(String),

    #[error("IO/{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OPERATOR/rule {rule_id}: unknown operator '{op}' on '{key}'")]
    UnknownOperator { rule_id: u32, key: String, op: String },

    #[error("DUPLICATE/rule id {0} defined more than once")]
    DuplicateRule(u32),

    #[error("VARIABLE/rule {rule_id}: '{key}' is not a {domain} variable")]
    UnknownVariable { rule_id: u32, domain: Domain, key: String },

    #[error("CONFIDENCE/rule {rule_id}: {value} is outside (0, 1]")]
    InvalidConfidence { rule_id: u32, value: f64 },

    #[error("DOMAIN/rule {0} has no domain")]
    MissingDomain(u32),

    #[error("REQUIRED/rule {0} has no required conditions")]
    NoRequiredConditions(u32),

    #[error("TEMPLATE/rule {rule_id}: {message}")]
    Template { rule_id: u32, message: String },
}
