//! Integration tests for the shipped rule catalog and rule file import.

use std::path::PathBuf;

use triage_core::{Domain, Facts, Severity};
use triage_rules::{
    builtin_rules, CatalogError, CatalogOptions, Evaluator, IssueLevel, RuleCatalog, RuleFile,
};

fn fixture(name: &str) -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    PathBuf::from(manifest_dir).join("tests").join("fixtures").join(name)
}

// =============================================================================
// Shipped rules
// =============================================================================

#[test]
fn test_builtin_catalog_shape() {
    let catalog = RuleCatalog::builtin();

    assert_eq!(catalog.rules_for(Domain::Network).len(), 57);
    assert_eq!(catalog.rules_for(Domain::Computer).len(), 46);
    assert!(catalog.excluded().is_empty());

    for rule in catalog.iter() {
        assert!(!rule.name.is_empty(), "rule {} has no name", rule.id);
        assert!(!rule.remedy.is_empty(), "rule {} has no remedy", rule.id);
        assert!(rule.base_confidence > 0.0 && rule.base_confidence <= 1.0);
        assert!(rule.required().count() > 0);
        assert!(rule.conditions.iter().all(|c| c.predicate.is_satisfiable()), "rule {}", rule.id);
    }
}

#[test]
fn test_builtin_rules_validate_cleanly() {
    let issues = builtin_rules().unwrap().validate();
    assert!(issues.is_empty(), "{:?}", issues);
}

#[test]
fn test_rules_stay_in_their_domain() {
    let catalog = RuleCatalog::builtin();
    for domain in Domain::ALL {
        assert!(catalog.rules_for(domain).iter().all(|r| r.domain == domain));
    }
    assert_eq!(catalog.get(4).unwrap().domain, Domain::Network);
    assert_eq!(catalog.get(60).unwrap().domain, Domain::Computer);
}

#[test]
fn test_weak_wifi_rules_share_a_name() {
    let mut weak: Vec<_> = RuleCatalog::builtin()
        .rules_for(Domain::Network)
        .iter()
        .filter(|r| r.name == "Weak WiFi Signal")
        .map(|r| r.base_confidence)
        .collect();
    weak.sort_by(|a, b| a.partial_cmp(b).unwrap());

    assert_eq!(weak, vec![0.6, 0.8]);
}

#[test]
fn test_overheating_rule_rewards_fan_fault() {
    let catalog = RuleCatalog::builtin();
    let rule = catalog.get(60).unwrap();
    let evaluator = Evaluator::new();

    let hot = Facts::new().with("cpu_temp", 85);
    let hot_no_fan = hot.clone().with("fan_speed_ok", false);

    let base = evaluator.evaluate(rule, &hot).unwrap();
    let boosted = evaluator.evaluate(rule, &hot_no_fan).unwrap();

    assert!(boosted.score > base.score);
    assert_eq!(boosted.score, 0.92);
    assert_eq!(rule.severity, Severity::Critical);
    assert_eq!(catalog.render_evidence(&boosted), "CPU temp dangerously high (85 °C)");
}

#[test]
fn test_link_local_address_matches_dhcp_rule() {
    let catalog = RuleCatalog::builtin();
    let rule = catalog.get(7).unwrap();
    let facts = Facts::new().with("ip_address", "169.254.3.7");

    let m = Evaluator::new().evaluate(rule, &facts).unwrap();
    assert_eq!(catalog.render_evidence(&m), "Device received link-local address 169.254.3.7");
}

// =============================================================================
// Rule import
// =============================================================================

#[test]
fn test_overlay_file() {
    let overlay = RuleFile::load(fixture("overlay.yaml")).unwrap();
    let catalog = RuleCatalog::with_overlay(overlay, &CatalogOptions::default()).unwrap();

    let evaluator = Evaluator::new();
    let latency = catalog.get(1).unwrap();
    assert!(evaluator.evaluate(latency, &Facts::new().with("ping_latency", 250)).is_none());
    assert!(evaluator.evaluate(latency, &Facts::new().with("ping_latency", 700)).is_some());

    let portal = catalog.get(150).unwrap();
    assert_eq!(portal.base_confidence, 0.9);
    assert_eq!(portal.severity, Severity::Critical);
    assert_eq!(catalog.rules_for(Domain::Network).last().unwrap().id, 150);
}

#[test]
fn test_legacy_json_list() {
    let legacy = RuleFile::load(fixture("legacy_rules.json")).unwrap();
    assert_eq!(legacy.domain, None);
    assert_eq!(legacy.rules.len(), 2);
    let issues = legacy.validate();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].level, IssueLevel::Warning);
    assert!(issues[0].message.contains("read as 0.75"));

    let catalog = RuleCatalog::with_overlay(legacy, &CatalogOptions::default()).unwrap();
    assert_eq!(catalog.rules_for(Domain::Computer).len(), 48);

    let rule = catalog.get(900).unwrap();
    assert_eq!(rule.base_confidence, 0.75);
    assert_eq!(rule.optional().next().unwrap().weight, 2.0);
    assert_eq!(catalog.get(901).unwrap().forbidden().count(), 1);
}

#[test]
fn test_broken_file_is_reported_and_rejected() {
    let file = RuleFile::load(fixture("broken.yaml")).unwrap();
    let errors: Vec<_> = file
        .validate()
        .into_iter()
        .filter(|i| i.level == IssueLevel::Error)
        .collect();

    assert_eq!(errors.len(), 3);
    assert!(errors.iter().all(|i| i.rule_id == 7));

    let err = RuleCatalog::load(fixture("broken.yaml"), &CatalogOptions::default()).unwrap_err();
    assert!(matches!(err, CatalogError::UnknownOperator { rule_id: 7, .. }));
}

#[test]
fn test_exported_json_loads_back() {
    let mut rules = builtin_rules().unwrap();
    rules.normalize();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.json");
    std::fs::write(&path, rules.to_json().unwrap()).unwrap();

    let loaded = RuleFile::load(&path).unwrap();
    assert_eq!(loaded, rules);

    let catalog = RuleCatalog::build(&loaded, &CatalogOptions::default()).unwrap();
    let ids: Vec<u32> = catalog.rules_for(Domain::Network).iter().map(|r| r.id).collect();
    let shipped: Vec<u32> = RuleCatalog::builtin()
        .rules_for(Domain::Network)
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, shipped);
    assert_eq!(catalog.rules_for(Domain::Computer).len(), 46);
}

#[test]
fn test_missing_file() {
    let err = RuleFile::load(fixture("does-not-exist.yaml")).unwrap_err();
    assert!(matches!(err, CatalogError::Io { .. }));
}
