//! Rule files: loading, validation, normalization and merging
//!
//! Accepts YAML or JSON, either as `{version, domain, rules: [...]}` or as a
//! bare list of rules. Conditions may be written with `key` or the legacy
//! `type` field; forbidden conditions live under `not_conditions`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use triage_core::{Domain, Severity, VariableCatalog};

use crate::error::CatalogError;
use crate::rule::{Condition, ConditionRole, Operator, Rule};
use crate::template::EvidenceTemplates;

fn default_version() -> String {
    "1.0".to_string()
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

/// A condition as authored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    #[serde(alias = "type")]
    pub key: String,
    #[serde(default = "default_op")]
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

fn default_op() -> String {
    "==".to_string()
}

/// A rule as authored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    #[serde(default)]
    pub name: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub remedy: String,
    #[serde(default)]
    pub conditions: Vec<ConditionSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_conditions: Vec<ConditionSpec>,
}

/// Top-level rule file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleFile {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl Default for RuleFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            domain: None,
            rules: Vec::new(),
        }
    }
}

/// Map authored confidences onto (0, 1]. Values in (1, 100] are read as
/// percentages and anything above 100 saturates; zero, negatives and NaN
/// have no meaning.
pub fn normalize_confidence(raw: f64) -> Option<f64> {
    if raw.is_nan() || raw <= 0.0 {
        None
    } else if raw <= 1.0 {
        Some(raw)
    } else if raw <= 100.0 {
        Some(raw / 100.0)
    } else {
        Some(1.0)
    }
}

/// How serious a validation finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
    /// The rule loads but behaves differently than written
    Warning,
    /// The catalog refuses to build
    Error,
}

/// A validation finding for one rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleIssue {
    pub rule_id: u32,
    pub level: IssueLevel,
    pub message: String,
}

impl RuleIssue {
    fn warning(rule_id: u32, message: impl Into<String>) -> Self {
        Self { rule_id, level: IssueLevel::Warning, message: message.into() }
    }

    fn error(rule_id: u32, message: impl Into<String>) -> Self {
        Self { rule_id, level: IssueLevel::Error, message: message.into() }
    }
}

impl fmt::Display for RuleIssue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let level = match self.level {
            IssueLevel::Warning => "warning",
            IssueLevel::Error => "error",
        };
        write!(f, "[{}] rule {}: {}", level, self.rule_id, self.message)
    }
}

impl ConditionSpec {
    fn compile(&self, rule_id: u32, domain: Domain, role: ConditionRole) -> Result<Condition, CatalogError> {
        let op: Operator = self.op.parse().map_err(|op| CatalogError::UnknownOperator {
            rule_id,
            key: self.key.clone(),
            op,
        })?;

        if !VariableCatalog::builtin(domain).contains(&self.key) {
            return Err(CatalogError::UnknownVariable {
                rule_id,
                domain,
                key: self.key.clone(),
            });
        }

        let weight = match self.weight {
            Some(w) if w.is_finite() && w > 0.0 => w,
            Some(w) => {
                tracing::warn!(rule_id, key = %self.key, weight = w, "invalid condition weight, using 1.0");
                1.0
            }
            None => 1.0,
        };

        Ok(Condition::new(self.key.clone(), op, self.value.clone())
            .with_role(role)
            .with_weight(weight))
    }
}

impl RuleSpec {
    /// Compile into a [`Rule`]. The evidence template is checked separately
    /// by the catalog, which owns the template registry.
    pub fn compile(&self, file_domain: Option<Domain>) -> Result<Rule, CatalogError> {
        let domain = self
            .domain
            .or(file_domain)
            .ok_or(CatalogError::MissingDomain(self.id))?;

        let confidence = normalize_confidence(self.confidence).ok_or(CatalogError::InvalidConfidence {
            rule_id: self.id,
            value: self.confidence,
        })?;

        let mut rule = Rule::new(self.id, domain, self.name.clone(), confidence)
            .with_severity(self.severity.unwrap_or_else(|| Severity::from_confidence(confidence)))
            .with_evidence(self.evidence.clone())
            .with_remedy(self.remedy.clone());

        for spec in &self.conditions {
            let role = if spec.required { ConditionRole::Required } else { ConditionRole::Optional };
            rule = rule.with_condition(spec.compile(self.id, domain, role)?);
        }
        for spec in &self.not_conditions {
            rule = rule.with_condition(spec.compile(self.id, domain, ConditionRole::Forbidden)?);
        }

        Ok(rule)
    }
}

impl RuleFile {
    /// Load a rule file, choosing the parser by extension (`.json` or YAML)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Parse YAML content
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let doc: serde_yaml::Value =
            serde_yaml::from_str(yaml).map_err(|e| CatalogError::Parse(format!("rule YAML: {}", e)))?;

        if doc.is_sequence() {
            let rules: Vec<RuleSpec> =
                serde_yaml::from_value(doc).map_err(|e| CatalogError::Parse(format!("rule list: {}", e)))?;
            Ok(Self { rules, ..Self::default() })
        } else {
            serde_yaml::from_value(doc).map_err(|e| CatalogError::Parse(format!("rule file: {}", e)))
        }
    }

    /// Parse JSON content
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let doc: Value =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(format!("rule JSON: {}", e)))?;

        if doc.is_array() {
            let rules: Vec<RuleSpec> =
                serde_json::from_value(doc).map_err(|e| CatalogError::Parse(format!("rule list: {}", e)))?;
            Ok(Self { rules, ..Self::default() })
        } else {
            serde_json::from_value(doc).map_err(|e| CatalogError::Parse(format!("rule file: {}", e)))
        }
    }

    pub fn to_yaml(&self) -> Result<String, CatalogError> {
        serde_yaml::to_string(self).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, CatalogError> {
        serde_json::to_string_pretty(self).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    /// Write each rule's domain and normalized confidence explicitly, so the
    /// rules survive being moved into another file.
    pub fn normalize(&mut self) {
        for rule in &mut self.rules {
            if rule.domain.is_none() {
                rule.domain = self.domain;
            }
            if let Some(c) = normalize_confidence(rule.confidence) {
                rule.confidence = c;
            }
        }
    }

    /// Merge another file by rule id. Overlay rules replace base rules in
    /// place; new ids are appended in overlay order.
    pub fn merge(&mut self, overlay: RuleFile) {
        let overlay_domain = overlay.domain;
        let base_domain = self.domain;

        if overlay_domain != base_domain {
            // Rules from either side may no longer inherit the right domain
            for rule in &mut self.rules {
                rule.domain = rule.domain.or(base_domain);
            }
            self.domain = None;
        }

        let positions: HashMap<u32, usize> = self
            .rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id, i))
            .collect();

        for mut rule in overlay.rules {
            if self.domain.is_none() {
                rule.domain = rule.domain.or(overlay_domain);
            }
            match positions.get(&rule.id) {
                Some(&i) => self.rules[i] = rule,
                None => self.rules.push(rule),
            }
        }
    }

    /// Every problem found in the file, errors and warnings alike
    pub fn validate(&self) -> Vec<RuleIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for spec in &self.rules {
            if !seen.insert(spec.id) {
                issues.push(RuleIssue::error(spec.id, "duplicate rule id"));
            }
            if spec.name.trim().is_empty() {
                issues.push(RuleIssue::warning(spec.id, "missing name"));
            }
            if spec.confidence > 1.0 {
                if let Some(c) = normalize_confidence(spec.confidence) {
                    issues.push(RuleIssue::warning(
                        spec.id,
                        format!("confidence {} read as {}", spec.confidence, c),
                    ));
                }
            }
            for (i, c) in spec.conditions.iter().chain(&spec.not_conditions).enumerate() {
                if let Some(w) = c.weight {
                    if !(w.is_finite() && w > 0.0) {
                        issues.push(RuleIssue::warning(
                            spec.id,
                            format!("condition[{}] has invalid weight {}, using 1.0", i, w),
                        ));
                    }
                }
            }

            let rule = match spec.compile(self.domain) {
                Ok(rule) => rule,
                Err(e) => {
                    issues.push(RuleIssue::error(spec.id, e.to_string()));
                    continue;
                }
            };

            if let Err(e) = EvidenceTemplates::check(rule.id, &rule.evidence_template) {
                issues.push(RuleIssue::error(spec.id, e.to_string()));
            }
            if rule.required().next().is_none() {
                issues.push(RuleIssue::warning(spec.id, "no required conditions, rule is excluded"));
            }
            for c in &rule.conditions {
                if !c.predicate.is_satisfiable() {
                    issues.push(RuleIssue::warning(
                        spec.id,
                        format!("condition '{}' can never be satisfied", c),
                    ));
                }
            }
        }

        issues
    }
}
