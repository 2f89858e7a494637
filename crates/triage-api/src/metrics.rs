//! Prometheus counters served on `/metrics`
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use triage_core::Domain;
use triage_engine::DiagnoseOutcome;

/// Counters of the diagnosis endpoints, on their own registry
#[derive(Clone)]
pub struct ApiMetrics {
    registry: Registry,
    diagnoses_run: IntCounterVec,
    sentinel_results: IntCounter,
    recorder_failures: IntCounter,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let diagnoses_run = IntCounterVec::new(
            Opts::new("triage_diagnoses_total", "Diagnosis runs by domain"),
            &["domain"],
        )?;
        let sentinel_results = IntCounter::new(
            "triage_insufficient_data_total",
            "Runs that ended in the insufficient data fallback",
        )?;
        let recorder_failures = IntCounter::new(
            "triage_recorder_failures_total",
            "Diagnoses whose case could not be recorded",
        )?;

        registry.register(Box::new(diagnoses_run.clone()))?;
        registry.register(Box::new(sentinel_results.clone()))?;
        registry.register(Box::new(recorder_failures.clone()))?;

        Ok(Self {
            registry,
            diagnoses_run,
            sentinel_results,
            recorder_failures,
        })
    }

    pub fn observe(&self, domain: Domain, outcome: &DiagnoseOutcome, recording: bool) {
        self.diagnoses_run.with_label_values(&[domain.as_str()]).inc();
        if outcome.is_insufficient_data() {
            self.sentinel_results.inc();
        }
        if recording && outcome.case_id.is_none() {
            self.recorder_failures.inc();
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

pub fn encode(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::Diagnosis;

    #[test]
    fn test_counters_are_exported() {
        let metrics = ApiMetrics::new().unwrap();
        let outcome = DiagnoseOutcome {
            diagnoses: vec![Diagnosis::insufficient_data(0.2)],
            case_id: None,
        };
        metrics.observe(Domain::Network, &outcome, true);

        let text = encode(metrics.registry()).unwrap();
        assert!(text.contains("triage_diagnoses_total{domain=\"Network\"} 1"));
        assert!(text.contains("triage_insufficient_data_total 1"));
        assert!(text.contains("triage_recorder_failures_total 1"));
    }
}
