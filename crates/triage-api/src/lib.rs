//! Triage API /v1: REST endpoints
pub mod error;
pub mod handlers;
pub mod metrics;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use triage_engine::DiagnosisService;

pub use error::ApiError;
pub use metrics::ApiMetrics;

/// Shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DiagnosisService>,
    pub metrics: Arc<ApiMetrics>,
}

impl AppState {
    pub fn new(service: DiagnosisService) -> Result<Self, prometheus::Error> {
        Ok(Self {
            service: Arc::new(service),
            metrics: Arc::new(ApiMetrics::new()?),
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/v1/diagnosis/run", post(handlers::run_diagnosis))
        .route("/v1/diagnosis/form", post(handlers::run_form))
        .route("/v1/rules", get(handlers::list_rules))
        .route("/v1/variables", get(handlers::list_variables))
        .route("/v1/health", get(handlers::health))
        .route("/metrics", get(handlers::export_metrics))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: &str, state: AppState) -> std::io::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Triage API listening on {}", addr);
    axum::serve(listener, app).await
}
