//! API Handlers
use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use triage_core::{CaseId, Diagnosis, Domain, Facts, VariableCatalog, VariableSpec, TRIAGE_VERSION};
use triage_rules::Rule;

use crate::error::ApiError;
use crate::metrics;
use crate::AppState;

/// Questions offered when the engine needs more facts
const FOLLOW_UP_LIMIT: usize = 3;

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub domain: String,
    #[serde(default)]
    pub facts: Map<String, Value>,
}

/// Raw form submission: every field arrives as a string
#[derive(Debug, Deserialize)]
pub struct FormRequest {
    pub domain: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// JSON object (or its text) merged over the fields
    #[serde(default)]
    pub structured: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct DiagnoseResponse {
    pub domain: Domain,
    pub diagnoses: Vec<Diagnosis>,
    pub case_id: Option<CaseId>,
    pub needs_more_info: bool,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub follow_up_questions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored_facts: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DomainQuery {
    pub domain: String,
}

#[derive(Debug, Serialize)]
pub struct RulesResponse<'a> {
    pub domain: Domain,
    pub total: usize,
    pub rules: &'a [Rule],
}

#[derive(Debug, Serialize)]
pub struct VariablesResponse<'a> {
    pub domain: Domain,
    pub variables: &'a [VariableSpec],
}

pub async fn run_diagnosis(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<DiagnoseResponse>, ApiError> {
    let domain: Domain = request.domain.parse()?;
    let (facts, ignored) = Facts::from_json(&request.facts);
    if !ignored.is_empty() {
        tracing::warn!(domain = %domain, ?ignored, "ignoring non-scalar facts");
    }

    diagnose(state, domain, facts, ignored).await
}

pub async fn run_form(
    State(state): State<AppState>,
    Json(request): Json<FormRequest>,
) -> Result<Json<DiagnoseResponse>, ApiError> {
    let domain: Domain = request.domain.parse()?;
    let catalog = VariableCatalog::builtin(domain);

    let mut facts = Facts::new();
    for (key, raw) in &request.fields {
        if let Some(value) = catalog.coerce(key, raw) {
            facts.insert(key.clone(), value);
        }
    }

    let mut ignored = Vec::new();
    match structured_object(request.structured) {
        Ok(Some(map)) => {
            let (structured, skipped) = Facts::from_json(&map);
            facts.merge(structured);
            ignored.extend(skipped);
        }
        Ok(None) => {}
        Err(reason) => {
            tracing::warn!(domain = %domain, %reason, "ignoring structured input");
            ignored.push("structured".to_string());
        }
    }

    diagnose(state, domain, facts, ignored).await
}

/// Accept the `structured` field as an object or as JSON text of one
fn structured_object(value: Option<Value>) -> Result<Option<Map<String, Value>>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(Value::String(text)) => match serde_json::from_str(&text) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Err("not a JSON object".to_string()),
            Err(e) => Err(e.to_string()),
        },
        Some(_) => Err("not a JSON object".to_string()),
    }
}

async fn diagnose(
    state: AppState,
    domain: Domain,
    facts: Facts,
    ignored_facts: Vec<String>,
) -> Result<Json<DiagnoseResponse>, ApiError> {
    let service = state.service.clone();
    let snapshot = facts.clone();
    let outcome = tokio::task::spawn_blocking(move || service.diagnose(domain, snapshot))
        .await
        .map_err(|e| ApiError::Internal(format!("diagnosis task failed: {}", e)))?;

    state.metrics.observe(domain, &outcome, state.service.is_recording());

    let catalog = VariableCatalog::builtin(domain);
    let needs_more_info = outcome.is_insufficient_data();
    let follow_up_questions = if needs_more_info {
        catalog.follow_up_questions(&facts, FOLLOW_UP_LIMIT)
    } else {
        Vec::new()
    };

    Ok(Json(DiagnoseResponse {
        domain,
        diagnoses: outcome.diagnoses,
        case_id: outcome.case_id,
        needs_more_info,
        is_complete: catalog.is_complete(&facts),
        follow_up_questions,
        ignored_facts,
    }))
}

pub async fn list_rules(
    State(state): State<AppState>,
    Query(query): Query<DomainQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let domain: Domain = query.domain.parse()?;
    let rules = state.service.engine().catalog().rules_for(domain);
    let body = serde_json::to_value(RulesResponse {
        domain,
        total: rules.len(),
        rules,
    })
    .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(body))
}

pub async fn list_variables(Query(query): Query<DomainQuery>) -> Result<impl IntoResponse, ApiError> {
    let domain: Domain = query.domain.parse()?;
    Ok(Json(VariablesResponse {
        domain,
        variables: VariableCatalog::builtin(domain).variables(),
    }))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": TRIAGE_VERSION,
            "rules": state.service.engine().catalog().len(),
        })),
    )
}

pub async fn export_metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let text = metrics::encode(state.metrics.registry()).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_object_forms() {
        assert_eq!(structured_object(None), Ok(None));
        assert_eq!(structured_object(Some(Value::String("  ".into()))), Ok(None));

        let from_text = structured_object(Some(Value::String(r#"{"cpu_temp": 85}"#.into())))
            .unwrap()
            .unwrap();
        assert_eq!(from_text.get("cpu_temp"), Some(&json!(85)));

        assert!(structured_object(Some(json!([1, 2]))).is_err());
        assert!(structured_object(Some(Value::String("{oops".into()))).is_err());
    }
}
