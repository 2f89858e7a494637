//! Diagnose service: infer, rank and archive in one call
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use triage_core::{Case, CaseId, Diagnosis, Domain, Facts, VariableCatalog};

use crate::config::EngineConfig;
use crate::engine::InferenceEngine;
use crate::error::ConfigError;
use crate::ranker::Ranker;
use crate::recorder::CaseRecorder;

/// Result of one diagnosis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnoseOutcome {
    /// Ranked diagnoses, never empty
    pub diagnoses: Vec<Diagnosis>,
    /// Identifier of the archived case, when recording succeeded
    pub case_id: Option<CaseId>,
}

impl DiagnoseOutcome {
    pub fn top(&self) -> Option<&Diagnosis> {
        self.diagnoses.first()
    }

    pub fn is_insufficient_data(&self) -> bool {
        self.diagnoses.len() == 1 && self.diagnoses[0].is_insufficient_data()
    }
}

/// Entry point shared by the HTTP API and the CLI
#[derive(Clone)]
pub struct DiagnosisService {
    engine: InferenceEngine,
    ranker: Ranker,
    recorder: Option<Arc<dyn CaseRecorder>>,
}

impl DiagnosisService {
    pub fn new(engine: InferenceEngine, ranker: Ranker) -> Self {
        Self {
            engine,
            ranker,
            recorder: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            InferenceEngine::from_config(config)?,
            Ranker::from_config(config),
        ))
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn CaseRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn ranker(&self) -> &Ranker {
        &self.ranker
    }

    /// Whether diagnoses are archived; a missing `case_id` then means the
    /// recorder failed
    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// Diagnose a fact set. Never fails: recorder errors are logged and
    /// leave `case_id` empty.
    ///
    /// The recorder runs inline so `case_id` can be returned, which means
    /// recorders must be fast. Async callers run this on a blocking thread.
    pub fn diagnose(&self, domain: Domain, facts: Facts) -> DiagnoseOutcome {
        for issue in VariableCatalog::builtin(domain).validate(&facts) {
            tracing::debug!(domain = %domain, %issue, "fact outside the variable catalog");
        }

        let candidates = self.engine.infer(domain, &facts);
        let fired = candidates.len();
        let diagnoses = self.ranker.rank(candidates);

        tracing::info!(
            domain = %domain,
            facts = facts.len(),
            fired,
            top = %diagnoses[0].name,
            confidence = diagnoses[0].confidence,
            "diagnosis complete"
        );

        let case_id = self.recorder.as_ref().and_then(|recorder| {
            let case = Case::new(domain, facts, diagnoses.clone());
            match recorder.record(&case) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(error = %e, case = %case.id, "failed to record case");
                    None
                }
            }
        });

        DiagnoseOutcome { diagnoses, case_id }
    }
}

impl Default for DiagnosisService {
    fn default() -> Self {
        Self::new(InferenceEngine::builtin(), Ranker::default())
    }
}

impl std::fmt::Debug for DiagnosisService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosisService")
            .field("rules", &self.engine.catalog().len())
            .field("ranker", &self.ranker)
            .field("recording", &self.recorder.is_some())
            .finish()
    }
}
