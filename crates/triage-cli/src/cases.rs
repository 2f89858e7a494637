//! Canonical smoke cases
use serde::Deserialize;

use triage_core::{Domain, Facts};
use triage_engine::{DiagnoseOutcome, DiagnosisService};

static CANONICAL_YAML: &str = include_str!("../cases/canonical.yaml");

/// A fact set and the diagnosis expected on top
#[derive(Debug, Clone, Deserialize)]
pub struct CanonicalCase {
    pub domain: Domain,
    #[serde(default)]
    pub facts: Facts,
    /// Substring of the expected top diagnosis name
    pub expect: String,
}

impl CanonicalCase {
    pub fn run(&self, service: &DiagnosisService) -> CaseResult {
        let outcome = service.diagnose(self.domain, self.facts.clone());
        let passed = outcome
            .top()
            .map(|d| d.name.contains(&self.expect))
            .unwrap_or(false);
        CaseResult { outcome, passed }
    }
}

#[derive(Debug)]
pub struct CaseResult {
    pub outcome: DiagnoseOutcome,
    pub passed: bool,
}

pub fn canonical_cases() -> Result<Vec<CanonicalCase>, serde_yaml::Error> {
    serde_yaml::from_str(CANONICAL_YAML)
}
