//! Data Model: Severity, DiagnosisCandidate, Diagnosis, Case
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::Domain;
use crate::facts::Facts;

/// Name of the diagnosis returned when nothing qualifies
pub const INSUFFICIENT_DATA: &str = "Insufficient Data to Diagnose";

/// How urgent the underlying issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Severity {
    #[default]
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl Severity {
    /// Severity assumed for imported rules that do not declare one
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.8 {
            Severity::Critical
        } else if confidence >= 0.6 {
            Severity::High
        } else if confidence >= 0.4 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

/// One fired rule's contribution, before same-name candidates are merged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisCandidate {
    pub name: String,
    /// Match score of the rule (0.0 to 1.0)
    pub confidence: f64,
    /// Rendered evidence template
    pub evidence: String,
    pub remedy: String,
    pub severity: Severity,
    pub source_rule_id: u32,
    /// Position of the source rule in its domain's authoring order
    pub catalog_position: usize,
    /// Share of optional corroboration found (1.0 when the rule has none)
    pub match_ratio: f64,
    /// Conditions that held, e.g. `cpu_temp = 85 (> 80)`
    #[serde(default)]
    pub matched_conditions: Vec<String>,
    /// Optional conditions that did not hold
    #[serde(default)]
    pub unmatched_conditions: Vec<String>,
}

/// A ranked, deduplicated diagnosis returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub name: String,
    /// Representative confidence (0.0 to 1.0)
    pub confidence: f64,
    /// Evidence of the strongest contributing rule
    pub evidence: String,
    /// Evidence and condition trace of every contributing rule
    pub reasoning: String,
    pub remedy: String,
    pub severity: Severity,
    /// Contributing rules in authoring order
    #[serde(default)]
    pub rule_ids: Vec<u32>,
}

impl Diagnosis {
    /// The fallback returned when no diagnosis reaches the threshold
    pub fn insufficient_data(confidence: f64) -> Self {
        Self {
            name: INSUFFICIENT_DATA.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            evidence: "Not enough facts supplied to identify root cause".to_string(),
            reasoning: "No rule reached the minimum confidence for the supplied facts".to_string(),
            remedy: "Collect more diagnostics (ping, speedtest, temps, logs).".to_string(),
            severity: Severity::Low,
            rule_ids: Vec::new(),
        }
    }

    pub fn is_insufficient_data(&self) -> bool {
        self.name == INSUFFICIENT_DATA && self.rule_ids.is_empty()
    }
}

/// Identifier assigned by a case recorder
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(pub String);

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for CaseId {
    fn from(id: Uuid) -> Self {
        CaseId(id.to_string())
    }
}

/// Write-once audit record of a diagnosis session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub domain: Domain,
    pub facts: Facts,
    /// Digest of the facts snapshot, for correlating repeated sessions
    pub facts_fingerprint: String,
    pub diagnoses: Vec<Diagnosis>,
}

impl Case {
    pub fn new(domain: Domain, facts: Facts, diagnoses: Vec<Diagnosis>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            domain,
            facts_fingerprint: facts.fingerprint(),
            facts,
            diagnoses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"High\"");
    }

    #[test]
    fn test_severity_from_confidence() {
        assert_eq!(Severity::from_confidence(0.95), Severity::Critical);
        assert_eq!(Severity::from_confidence(0.6), Severity::High);
        assert_eq!(Severity::from_confidence(0.45), Severity::Medium);
        assert_eq!(Severity::from_confidence(0.1), Severity::Low);
    }

    #[test]
    fn test_insufficient_data() {
        let d = Diagnosis::insufficient_data(0.2);
        assert!(d.is_insufficient_data());
        assert_eq!(d.confidence, 0.2);
        assert_eq!(d.name, INSUFFICIENT_DATA);

        assert_eq!(Diagnosis::insufficient_data(7.0).confidence, 1.0);
    }

    #[test]
    fn test_case_snapshot() {
        let facts = Facts::new().with("cpu_temp", 90);
        let case = Case::new(Domain::Computer, facts.clone(), vec![]);

        assert_eq!(case.facts, facts);
        assert_eq!(case.facts_fingerprint, facts.fingerprint());
        assert_eq!(CaseId::from(case.id).to_string(), case.id.to_string());
    }
}
