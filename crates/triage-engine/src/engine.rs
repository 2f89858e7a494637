//! Inference Engine: runs every rule of a domain against a fact set
use std::ops::Deref;
use std::sync::Arc;

use triage_core::{DiagnosisCandidate, Domain, Facts};
use triage_rules::{CatalogOptions, Evaluator, RuleCatalog, RuleFile};

use crate::config::EngineConfig;
use crate::error::ConfigError;

/// Either the shipped catalog or one built from configuration
#[derive(Debug, Clone)]
enum CatalogHandle {
    Builtin(&'static RuleCatalog),
    Custom(Arc<RuleCatalog>),
}

impl Deref for CatalogHandle {
    type Target = RuleCatalog;

    fn deref(&self) -> &RuleCatalog {
        match self {
            CatalogHandle::Builtin(catalog) => catalog,
            CatalogHandle::Custom(catalog) => catalog,
        }
    }
}

/// Turns facts into diagnosis candidates. Stateless between calls.
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    catalog: CatalogHandle,
    evaluator: Evaluator,
}

impl InferenceEngine {
    /// Engine over the shipped rules with default scoring
    pub fn builtin() -> Self {
        Self {
            catalog: CatalogHandle::Builtin(RuleCatalog::builtin()),
            evaluator: Evaluator::new(),
        }
    }

    pub fn with_catalog(catalog: Arc<RuleCatalog>) -> Self {
        Self {
            catalog: CatalogHandle::Custom(catalog),
            evaluator: Evaluator::new(),
        }
    }

    /// Build the engine a configuration describes. The shipped catalog is
    /// reused unless extra rules or strict loading ask for a fresh build.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let engine = match &config.rules_path {
            None if !config.strict_catalog => Self::builtin(),
            rules_path => {
                let overlay = match rules_path {
                    Some(path) => RuleFile::load(path)?,
                    None => RuleFile::default(),
                };
                let options = CatalogOptions { strict: config.strict_catalog };
                Self::with_catalog(Arc::new(RuleCatalog::with_overlay(overlay, &options)?))
            }
        };

        Ok(engine.with_evaluator(Evaluator::new().with_optional_floor(config.optional_floor)))
    }

    pub fn with_evaluator(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// One candidate per fired rule, in catalog order
    pub fn infer(&self, domain: Domain, facts: &Facts) -> Vec<DiagnosisCandidate> {
        let rules = self.catalog.rules_for(domain);
        let mut candidates = Vec::new();

        for (position, rule) in rules.iter().enumerate() {
            let Some(m) = self.evaluator.evaluate(rule, facts) else {
                continue;
            };

            tracing::debug!(
                rule_id = rule.id,
                name = %rule.name,
                score = m.score,
                match_ratio = m.match_ratio,
                "rule fired"
            );

            candidates.push(DiagnosisCandidate {
                name: rule.name.clone(),
                confidence: m.score,
                evidence: self.catalog.render_evidence(&m),
                remedy: rule.remedy.clone(),
                severity: rule.severity,
                source_rule_id: rule.id,
                catalog_position: position,
                match_ratio: m.match_ratio,
                matched_conditions: m.matched_descriptions(),
                unmatched_conditions: m.unmatched_descriptions(),
            });
        }

        candidates
    }
}

impl Default for InferenceEngine {
    fn default() -> Self {
        Self::builtin()
    }
}
