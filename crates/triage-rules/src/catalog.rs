//! The rule catalog
//!
//! Built once from rule files, then read-only. Rules keep their authoring
//! order within each domain; that position breaks ranking ties.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::Path;

use triage_core::Domain;

use crate::error::CatalogError;
use crate::evaluator::RuleMatch;
use crate::loader::RuleFile;
use crate::rule::Rule;
use crate::template::EvidenceTemplates;

const NETWORK_RULES: &str = include_str!("../rules/network.yaml");
const COMPUTER_RULES: &str = include_str!("../rules/computer.yaml");

static BUILTIN: Lazy<RuleCatalog> = Lazy::new(|| {
    builtin_rules()
        .and_then(|file| RuleCatalog::build(&file, &CatalogOptions::default()))
        .expect("builtin rule catalog is valid")
});

/// The shipped rule definitions of both domains, as one file
pub fn builtin_rules() -> Result<RuleFile, CatalogError> {
    let mut network = RuleFile::from_yaml(NETWORK_RULES)?;
    let mut computer = RuleFile::from_yaml(COMPUTER_RULES)?;
    network.normalize();
    computer.normalize();

    network.rules.append(&mut computer.rules);
    network.domain = None;
    Ok(network)
}

/// Catalog build settings
#[derive(Debug, Clone, Default)]
pub struct CatalogOptions {
    /// Fail on rules without required conditions instead of excluding them
    pub strict: bool,
}

impl CatalogOptions {
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

/// Immutable, domain-partitioned rule collection
#[derive(Debug)]
pub struct RuleCatalog {
    network: Vec<Rule>,
    computer: Vec<Rule>,
    templates: EvidenceTemplates,
    excluded: Vec<u32>,
}

impl RuleCatalog {
    /// The process-wide catalog built from the shipped rules
    pub fn builtin() -> &'static RuleCatalog {
        &BUILTIN
    }

    /// Build from a rule file
    pub fn build(file: &RuleFile, options: &CatalogOptions) -> Result<Self, CatalogError> {
        let mut catalog = RuleCatalog {
            network: Vec::new(),
            computer: Vec::new(),
            templates: EvidenceTemplates::new(),
            excluded: Vec::new(),
        };
        let mut seen = HashSet::new();

        for spec in &file.rules {
            if !seen.insert(spec.id) {
                return Err(CatalogError::DuplicateRule(spec.id));
            }

            let rule = spec.compile(file.domain)?;
            catalog.templates.register(rule.id, &rule.evidence_template)?;

            if rule.required().next().is_none() {
                if options.strict {
                    return Err(CatalogError::NoRequiredConditions(rule.id));
                }
                tracing::warn!(rule_id = rule.id, name = %rule.name, "rule has no required conditions, excluded");
                catalog.excluded.push(rule.id);
                continue;
            }

            for condition in rule.conditions.iter().filter(|c| !c.predicate.is_satisfiable()) {
                tracing::warn!(rule_id = rule.id, condition = %condition, "condition can never be satisfied");
            }

            match rule.domain {
                Domain::Network => catalog.network.push(rule),
                Domain::Computer => catalog.computer.push(rule),
            }
        }

        tracing::info!(
            network = catalog.network.len(),
            computer = catalog.computer.len(),
            excluded = catalog.excluded.len(),
            "rule catalog built"
        );

        Ok(catalog)
    }

    pub fn from_yaml(yaml: &str, options: &CatalogOptions) -> Result<Self, CatalogError> {
        Self::build(&RuleFile::from_yaml(yaml)?, options)
    }

    /// Build from a rule file on disk, without the shipped rules
    pub fn load(path: impl AsRef<Path>, options: &CatalogOptions) -> Result<Self, CatalogError> {
        Self::build(&RuleFile::load(path)?, options)
    }

    /// The shipped rules with another file merged over them by id
    pub fn with_overlay(overlay: RuleFile, options: &CatalogOptions) -> Result<Self, CatalogError> {
        let mut file = builtin_rules()?;
        file.merge(overlay);
        Self::build(&file, options)
    }

    /// Rules of a domain, in authoring order
    pub fn rules_for(&self, domain: Domain) -> &[Rule] {
        match domain {
            Domain::Network => &self.network,
            Domain::Computer => &self.computer,
        }
    }

    pub fn get(&self, id: u32) -> Option<&Rule> {
        self.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.network.iter().chain(self.computer.iter())
    }

    pub fn len(&self) -> usize {
        self.network.len() + self.computer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of rules left out because they had no required conditions
    pub fn excluded(&self) -> &[u32] {
        &self.excluded
    }

    /// Evidence for a fired rule, rendered from the facts that satisfied it.
    /// Falls back to the raw template text if rendering fails.
    pub fn render_evidence(&self, m: &RuleMatch<'_, '_>) -> String {
        self.templates
            .render(m.rule.id, &m.matched_facts())
            .unwrap_or_else(|| m.rule.evidence_template.clone())
    }
}
