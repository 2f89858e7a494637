//! Triage Engine: Inference, Ranking and Case Recording
//!
//! ```text
//! Facts → InferenceEngine::infer → candidates → Ranker::rank → diagnoses
//!                                                                  ↓
//!                                                          CaseRecorder::record
//! ```
//!
//! [`DiagnosisService`] wires the three together and is what the HTTP API and
//! the CLI call.
//!
//! # Example
//!
//! ```
//! use triage_core::{Domain, Facts};
//! use triage_engine::DiagnosisService;
//!
//! let service = DiagnosisService::default();
//! let facts = Facts::new().with("cpu_temp", 85).with("fan_speed_ok", false);
//!
//! let outcome = service.diagnose(Domain::Computer, facts);
//! assert_eq!(outcome.diagnoses[0].name, "Overheating — Fan/Heatsink Fault");
//! assert_eq!(outcome.diagnoses[0].confidence, 0.92);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod ranker;
pub mod recorder;
pub mod service;

pub use config::EngineConfig;
pub use engine::InferenceEngine;
pub use error::{ConfigError, RecorderError};
pub use ranker::Ranker;
pub use recorder::{read_cases, CaseRecorder, JsonlRecorder, MemoryRecorder};
pub use service::{DiagnoseOutcome, DiagnosisService};
