//! Triage Core: Fact Model, Domains and Diagnosis Data Model
//!
//! Shared vocabulary of the diagnosis pipeline. Facts arrive from an external
//! collaborator (form fields, parsed JSON, a chat front end), are checked
//! against a per-domain [`VariableCatalog`], and leave the engine as ranked
//! [`Diagnosis`] values that may be archived as a [`Case`].
//!
//! # Example
//!
//! ```
//! use triage_core::{Domain, Facts, VariableCatalog};
//!
//! let facts = Facts::new()
//!     .with("cpu_temp", 85)
//!     .with("fan_speed_ok", false);
//!
//! let catalog = VariableCatalog::builtin(Domain::Computer);
//! assert!(catalog.validate(&facts).is_empty());
//! ```

pub mod catalog;
pub mod data_model;
pub mod domain;
pub mod error;
pub mod facts;

pub use catalog::{Completeness, FactIssue, VariableCatalog, VariableSpec};
pub use data_model::{Case, CaseId, Diagnosis, DiagnosisCandidate, Severity, INSUFFICIENT_DATA};
pub use domain::Domain;
pub use error::TriageError;
pub use facts::{FactValue, Facts, ValueKind};

/// Version of the triage engine
pub const TRIAGE_VERSION: &str = "1.0.0";
