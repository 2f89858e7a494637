//! End-to-end diagnosis tests over the shipped rules.

use triage_core::{Domain, Facts, Severity, INSUFFICIENT_DATA};
use triage_engine::{DiagnosisService, EngineConfig, InferenceEngine, Ranker};

fn service() -> DiagnosisService {
    DiagnosisService::default()
}

fn names(domain: Domain, facts: Facts) -> Vec<String> {
    service()
        .diagnose(domain, facts)
        .diagnoses
        .into_iter()
        .map(|d| d.name)
        .collect()
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_repeated_runs_are_byte_identical() {
    let facts = Facts::new()
        .with("ping_latency", 250)
        .with("speed_mbps", 0.4)
        .with("wifi_connected", true)
        .with("ping_ip", "success")
        .with("ping_domain", "fail");

    let first = serde_json::to_string(&service().diagnose(Domain::Network, facts.clone()).diagnoses).unwrap();
    for _ in 0..10 {
        let again = serde_json::to_string(&service().diagnose(Domain::Network, facts.clone()).diagnoses).unwrap();
        assert_eq!(first, again);
    }
}

#[test]
fn test_missing_required_fact_blocks_rule() {
    // ping_ip alone is half of the DNS rule
    let names = names(Domain::Network, Facts::new().with("ping_ip", "success"));
    assert_eq!(names, vec![INSUFFICIENT_DATA]);
}

#[test]
fn test_wrongly_shaped_fact_is_inert() {
    let facts = Facts::new().with("cpu_temp", "very hot");
    let outcome = service().diagnose(Domain::Computer, facts);
    assert!(outcome.is_insufficient_data());
}

#[test]
fn test_forbidden_condition_vetoes() {
    let slow = Facts::new().with("speed_mbps", 0.4);
    assert!(names(Domain::Network, slow.clone()).contains(&"Slow Network — Low Throughput".to_string()));

    let on_mobile = slow.with("client_online_via", "mobile");
    let names = names(Domain::Network, on_mobile);
    assert!(!names.contains(&"Slow Network — Low Throughput".to_string()));
    assert_eq!(names[0], "Mobile Carrier Data Fallback");
}

#[test]
fn test_confidences_stay_in_bounds() {
    let facts = Facts::new()
        .with("cpu_temp", 95)
        .with("fan_speed_ok", false)
        .with("slow_performance", true)
        .with("core_temp_delta", 30)
        .with("disk_health", 10)
        .with("ram_usage", 97)
        .with("app_crash", true)
        .with("popups", true)
        .with("idle_cpu", 99);

    let outcome = service().diagnose(Domain::Computer, facts);
    assert!(outcome.diagnoses.len() <= 5);
    assert!(outcome.diagnoses.iter().all(|d| (0.0..=1.0).contains(&d.confidence)));
    assert!(outcome
        .diagnoses
        .windows(2)
        .all(|w| w[0].confidence >= w[1].confidence));
}

#[test]
fn test_threshold_and_sentinel_follow_config() {
    let config = EngineConfig {
        min_confidence: 0.9,
        sentinel_confidence: 0.05,
        ..EngineConfig::default()
    };
    let service = DiagnosisService::from_config(&config).unwrap();

    // 0.65 latency rule is below the cutoff
    let outcome = service.diagnose(Domain::Network, Facts::new().with("ping_latency", 250));
    assert!(outcome.is_insufficient_data());
    assert_eq!(outcome.diagnoses[0].confidence, 0.05);

    let outcome = service.diagnose(Domain::Network, Facts::new().with("ip_conflict_msg", true));
    assert_eq!(outcome.diagnoses[0].name, "IP Address Conflict");
}

#[test]
fn test_max_results_truncates() {
    let config = EngineConfig::default().with_max_results(2);
    let service = DiagnosisService::from_config(&config).unwrap();

    let facts = Facts::new()
        .with("ping_latency", 250)
        .with("speed_mbps", 0.4)
        .with("ping_ip", "success")
        .with("ping_domain", "fail");
    let outcome = service.diagnose(Domain::Network, facts);

    assert_eq!(outcome.diagnoses.len(), 2);
    assert_eq!(outcome.diagnoses[0].name, "DNS Resolution Failure");
    assert_eq!(outcome.diagnoses[1].name, "Slow Network — Low Throughput");
}

#[test]
fn test_equal_confidence_keeps_catalog_order() {
    // rules 5 and 3 are both 0.95; 3 comes first in the catalog
    let facts = Facts::new()
        .with("ip_conflict_msg", true)
        .with("gateway_ping", "fail")
        .with("wifi_connected", true);
    let names = names(Domain::Network, facts);
    assert_eq!(names, vec!["Router/Gateway Failure", "IP Address Conflict"]);
}

#[test]
fn test_same_name_rules_collapse() {
    let facts = Facts::new()
        .with("gateway_ping", "success")
        .with("ping_ip", "success")
        .with("ping_domain", "fail");

    let outcome = service().diagnose(Domain::Network, facts);
    assert_eq!(outcome.diagnoses.len(), 1);

    let dns = &outcome.diagnoses[0];
    assert_eq!(dns.name, "DNS Resolution Failure");
    assert_eq!(dns.confidence, 0.95);
    assert_eq!(dns.rule_ids, vec![4, 102]);
    assert_eq!(dns.evidence, "IP pings succeed (success) but domain names fail (fail)");
    assert!(dns.reasoning.contains("Gateway reachable (success) but host names fail (fail)"));
}

#[test]
fn test_zero_valued_fact_appears_in_evidence() {
    let facts = Facts::new().with("speed_variance", true).with("speed_mbps", 0);
    let candidates = InferenceEngine::builtin().infer(Domain::Network, &facts);

    let throttling = candidates.iter().find(|c| c.source_rule_id == 22).unwrap();
    assert_eq!(throttling.confidence, 0.6);
    assert_eq!(throttling.evidence, "Speed varies with service type/time (currently 0 Mbps)");
}

#[test]
fn test_custom_engine_and_ranker() {
    let engine = InferenceEngine::from_config(&EngineConfig::default().strict()).unwrap();
    let ranker = Ranker {
        max_results: 1,
        ..Ranker::default()
    };
    let service = DiagnosisService::new(engine, ranker);

    let outcome = service.diagnose(Domain::Computer, Facts::new().with("pc_power", false));
    assert_eq!(outcome.diagnoses.len(), 1);
    assert_eq!(outcome.diagnoses[0].rule_ids, vec![56]);
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_scenario_dns_above_slow_connection() {
    let facts = Facts::new()
        .with("ping_latency", 250)
        .with("speed_mbps", 0.4)
        .with("wifi_connected", true)
        .with("ping_ip", "success")
        .with("ping_domain", "fail");

    let names = names(Domain::Network, facts);
    assert_eq!(
        names,
        vec![
            "DNS Resolution Failure",
            "Slow Network — Low Throughput",
            "Slow Network — High Latency",
        ]
    );
}

#[test]
fn test_scenario_overheating_with_fan_fault() {
    let with_fan = service().diagnose(
        Domain::Computer,
        Facts::new().with("cpu_temp", 85).with("fan_speed_ok", false),
    );
    let without_fan = service().diagnose(Domain::Computer, Facts::new().with("cpu_temp", 85));

    let top = &with_fan.diagnoses[0];
    assert!(top.name.starts_with("Overheating"));
    assert_eq!(top.severity, Severity::Critical);
    assert_eq!(top.confidence, 0.92);
    assert!(top.confidence > without_fan.diagnoses[0].confidence);
    assert_eq!(without_fan.diagnoses[0].confidence, 0.46);
}

#[test]
fn test_scenario_empty_facts() {
    for domain in Domain::ALL {
        let outcome = service().diagnose(domain, Facts::new());
        assert_eq!(outcome.diagnoses.len(), 1);
        assert_eq!(outcome.diagnoses[0].name, INSUFFICIENT_DATA);
        assert_eq!(outcome.diagnoses[0].confidence, 0.2);
        assert!(outcome.diagnoses[0].rule_ids.is_empty());
    }
}

#[test]
fn test_scenario_weak_wifi_collapses() {
    let facts = Facts::new()
        .with("rssi", -80)
        .with("wifi_connected", true)
        .with("signal_bars", 1);

    let outcome = service().diagnose(Domain::Network, facts);
    assert_eq!(outcome.diagnoses.len(), 1);

    let wifi = &outcome.diagnoses[0];
    assert_eq!(wifi.name, "Weak WiFi Signal");
    assert_eq!(wifi.confidence, 0.8);
    assert_eq!(wifi.rule_ids, vec![11, 101]);
    assert!(wifi.reasoning.contains("Low signal strength (-80 dBm)"));
    assert!(wifi.reasoning.contains("Client shows 1 signal bar(s)"));
}

// =============================================================================
// Canonical cases
// =============================================================================

#[test]
fn test_canonical_cases() {
    let cases: Vec<(Domain, Facts, &str)> = vec![
        (
            Domain::Network,
            Facts::new().with("ping_latency", 250).with("wifi_connected", true),
            "High Latency",
        ),
        (Domain::Network, Facts::new().with("speed_mbps", 0.2), "Low Throughput"),
        (
            Domain::Network,
            Facts::new().with("gateway_ping", "fail").with("wifi_connected", true),
            "Router/Gateway Failure",
        ),
        (
            Domain::Network,
            Facts::new().with("ping_ip", "success").with("ping_domain", "fail"),
            "DNS Resolution Failure",
        ),
        (Domain::Network, Facts::new().with("ip_conflict_msg", true), "IP Address Conflict"),
        (Domain::Network, Facts::new().with("packet_loss", 12), "High Packet Loss"),
        (Domain::Computer, Facts::new().with("disk_health", 30), "Failing HDD/SSD"),
        (Domain::Computer, Facts::new().with("cpu_temp", 86), "Overheating"),
        (Domain::Computer, Facts::new().with("pc_power", false), "No Power"),
        (Domain::Computer, Facts::new(), "Insufficient Data"),
    ];

    let service = service();
    for (i, (domain, facts, expected)) in cases.into_iter().enumerate() {
        let outcome = service.diagnose(domain, facts);
        let top = outcome.top().unwrap();
        assert!(
            top.name.contains(expected),
            "case {}: expected '{}', got '{}'",
            i + 1,
            expected,
            top.name
        );
    }
}
