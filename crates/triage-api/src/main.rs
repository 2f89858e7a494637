//! Binary entrypoint for the Triage API server.
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use triage_api::{run, AppState};
use triage_engine::{DiagnosisService, EngineConfig, JsonlRecorder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Default listen address can be overridden with TRIAGE_ADDR
    let addr = std::env::var("TRIAGE_ADDR").unwrap_or_else(|_| "0.0.0.0:8787".to_string());

    let config = match std::env::var("TRIAGE_CONFIG") {
        Ok(path) => EngineConfig::load(&path).with_context(|| format!("loading engine config {}", path))?,
        Err(_) => EngineConfig::default(),
    };

    let mut service = DiagnosisService::from_config(&config).context("building rule catalog")?;
    if let Ok(path) = std::env::var("TRIAGE_CASE_LOG") {
        let recorder = JsonlRecorder::open(&path).with_context(|| format!("opening case log {}", path))?;
        tracing::info!(path = %path, "recording cases");
        service = service.with_recorder(Arc::new(recorder));
    }

    let state = AppState::new(service).context("registering metrics")?;
    run(&addr, state).await.context("serving API")
}
