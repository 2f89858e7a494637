//! Variable catalogs: the recognized fact keys of each domain
//!
//! Catalogs document and validate input. They never decide whether a rule
//! matches; an unknown key is reported but stays in the fact set, inert.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::domain::Domain;
use crate::error::TriageError;
use crate::facts::{FactValue, Facts, ValueKind};

static NETWORK_YAML: &str = include_str!("../catalog/network.yaml");
static COMPUTER_YAML: &str = include_str!("../catalog/computer.yaml");

static NETWORK: Lazy<VariableCatalog> = Lazy::new(|| {
    VariableCatalog::from_yaml(NETWORK_YAML).expect("builtin network catalog is valid")
});
static COMPUTER: Lazy<VariableCatalog> = Lazy::new(|| {
    VariableCatalog::from_yaml(COMPUTER_YAML).expect("builtin computer catalog is valid")
});

/// Declaration of one recognized fact key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableSpec {
    pub key: String,
    pub kind: ValueKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Closed enumeration for text variables; empty means free text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Primary variables count toward completeness and are asked first
    #[serde(default)]
    pub primary: bool,
    /// Follow-up question shown when the variable is missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

/// How many facts make a request worth diagnosing
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Completeness {
    pub min_facts: usize,
    pub min_primary_facts: usize,
}

impl Default for Completeness {
    fn default() -> Self {
        Self {
            min_facts: 3,
            min_primary_facts: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    #[allow(dead_code)]
    version: String,
    domain: Domain,
    #[serde(default)]
    completeness: Completeness,
    variables: Vec<VariableSpec>,
}

/// A problem found while validating facts against a catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum FactIssue {
    UnknownKey { key: String },
    KindMismatch { key: String, expected: ValueKind, actual: ValueKind },
    NotAllowed { key: String, value: String },
    OutOfRange { key: String, value: f64 },
}

impl fmt::Display for FactIssue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FactIssue::UnknownKey { key } => write!(f, "{}: not a recognized variable", key),
            FactIssue::KindMismatch { key, expected, actual } => {
                write!(f, "{}: expected {:?}, got {:?}", key, expected, actual)
            }
            FactIssue::NotAllowed { key, value } => {
                write!(f, "{}: '{}' is not one of the allowed values", key, value)
            }
            FactIssue::OutOfRange { key, value } => {
                write!(f, "{}: {} is outside the plausible range", key, value)
            }
        }
    }
}

/// Recognized variables of one domain, in authoring order
#[derive(Debug, Clone)]
pub struct VariableCatalog {
    domain: Domain,
    completeness: Completeness,
    variables: Vec<VariableSpec>,
    index: HashMap<String, usize>,
}

impl VariableCatalog {
    /// Parse a catalog from YAML content
    pub fn from_yaml(yaml: &str) -> Result<Self, TriageError> {
        let file: CatalogFile = serde_yaml::from_str(yaml)
            .map_err(|e| TriageError::VariableCatalog(format!("Failed to parse catalog YAML: {}", e)))?;

        let mut index = HashMap::with_capacity(file.variables.len());
        for (i, var) in file.variables.iter().enumerate() {
            if index.insert(var.key.clone(), i).is_some() {
                return Err(TriageError::VariableCatalog(format!(
                    "{} declares '{}' twice",
                    file.domain, var.key
                )));
            }
        }

        Ok(Self {
            domain: file.domain,
            completeness: file.completeness,
            variables: file.variables,
            index,
        })
    }

    /// The embedded catalog for a domain
    pub fn builtin(domain: Domain) -> &'static VariableCatalog {
        match domain {
            Domain::Network => &NETWORK,
            Domain::Computer => &COMPUTER,
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn get(&self, key: &str) -> Option<&VariableSpec> {
        self.index.get(key).map(|&i| &self.variables[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn variables(&self) -> &[VariableSpec] {
        &self.variables
    }

    /// Report every fact that does not fit its declaration
    pub fn validate(&self, facts: &Facts) -> Vec<FactIssue> {
        let mut issues = Vec::new();

        for (key, value) in facts.iter() {
            let Some(spec) = self.get(key) else {
                issues.push(FactIssue::UnknownKey { key: key.clone() });
                continue;
            };

            if value.kind() != spec.kind {
                issues.push(FactIssue::KindMismatch {
                    key: key.clone(),
                    expected: spec.kind,
                    actual: value.kind(),
                });
                continue;
            }

            match value {
                FactValue::Text(s) if !spec.allowed.is_empty() && !spec.allowed.contains(s) => {
                    issues.push(FactIssue::NotAllowed {
                        key: key.clone(),
                        value: s.clone(),
                    });
                }
                FactValue::Int(_) | FactValue::Float(_) => {
                    let n = value.as_f64().unwrap_or_default();
                    let below = spec.min.is_some_and(|min| n < min);
                    let above = spec.max.is_some_and(|max| n > max);
                    if below || above {
                        issues.push(FactIssue::OutOfRange { key: key.clone(), value: n });
                    }
                }
                _ => {}
            }
        }

        issues
    }

    /// Convert a raw form field into a typed fact using the declared kind.
    ///
    /// This is the one explicit conversion point for string transports such
    /// as HTML forms; the engine itself never coerces. Empty input yields
    /// `None`. Undeclared keys become numbers when they parse as one.
    pub fn coerce(&self, key: &str, raw: &str) -> Option<FactValue> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let kind = self.get(key).map(|spec| spec.kind);
        let value = match kind {
            Some(ValueKind::Bool) => match raw {
                "true" | "True" => FactValue::Bool(true),
                "false" | "False" => FactValue::Bool(false),
                other => FactValue::Text(other.to_string()),
            },
            Some(ValueKind::Text) => FactValue::Text(raw.to_string()),
            Some(ValueKind::Number) | None => parse_number(raw)
                .unwrap_or_else(|| FactValue::Text(raw.to_string())),
        };

        Some(value)
    }

    /// Whether the fact set carries enough signal for a useful diagnosis
    pub fn is_complete(&self, facts: &Facts) -> bool {
        if facts.is_empty() {
            return false;
        }

        let primary_present = self
            .variables
            .iter()
            .filter(|v| v.primary && facts.has(&v.key))
            .count();

        facts.len() >= self.completeness.min_facts
            || primary_present >= self.completeness.min_primary_facts
    }

    /// Questions for missing variables: primary ones first; secondary
    /// questions only once every primary variable is known.
    pub fn follow_up_questions(&self, facts: &Facts, limit: usize) -> Vec<String> {
        let missing = |primary: bool| {
            self.variables
                .iter()
                .filter(move |v| v.primary == primary && !facts.has(&v.key))
                .filter_map(|v| v.question.clone())
        };

        let mut questions: Vec<String> = missing(true).collect();
        if questions.is_empty() {
            questions.extend(missing(false).take(1));
        }
        questions.truncate(limit);
        questions
    }
}

fn parse_number(raw: &str) -> Option<FactValue> {
    if let Ok(i) = raw.parse::<i64>() {
        return Some(FactValue::Int(i));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(FactValue::Float)
}
