//! Triage Rules: Rule Catalog, Rule Files and Predicate Evaluation
//!
//! Rules are authored in YAML (or JSON), compiled once into a
//! [`RuleCatalog`], and scored against a fact set by the [`Evaluator`].
//!
//! ```text
//! rules/*.yaml → RuleFile → RuleSpec::compile → RuleCatalog
//!                                                   ↓
//!                              Facts → Evaluator → RuleMatch → evidence
//! ```
//!
//! # Example
//!
//! ```
//! use triage_core::{Domain, Facts};
//! use triage_rules::{Evaluator, RuleCatalog};
//!
//! let catalog = RuleCatalog::builtin();
//! let facts = Facts::new().with("ping_ip", "success").with("ping_domain", "fail");
//!
//! let evaluator = Evaluator::new();
//! let fired: Vec<_> = catalog
//!     .rules_for(Domain::Network)
//!     .iter()
//!     .filter_map(|rule| evaluator.evaluate(rule, &facts))
//!     .collect();
//!
//! assert_eq!(fired[0].rule.name, "DNS Resolution Failure");
//! ```

pub mod catalog;
pub mod error;
pub mod evaluator;
pub mod loader;
pub mod rule;
pub mod template;

pub use catalog::{builtin_rules, CatalogOptions, RuleCatalog};
pub use error::CatalogError;
pub use evaluator::{ConditionHit, Evaluator, RuleMatch, DEFAULT_OPTIONAL_FLOOR};
pub use loader::{normalize_confidence, ConditionSpec, IssueLevel, RuleFile, RuleIssue, RuleSpec};
pub use rule::{Comparison, Condition, ConditionRole, Operator, Predicate, Rule};
pub use template::EvidenceTemplates;
