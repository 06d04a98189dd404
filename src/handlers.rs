use crate::circuit_breaker::EnrichmentCircuitBreaker;
use crate::client::EnrichmentClient;
use crate::config::Config;
use crate::credentials::TokenService;
use crate::errors::{AppError, EnrichmentError};
use crate::webhook_models::{WorkflowEnrichRequest, WorkflowEnrichResponse};
use crate::workflow::run_enrichment_task;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use failsafe::futures::CircuitBreaker;
use moka::future::Cache;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for the Hint enrichment service.
    pub client: EnrichmentClient<TokenService>,
    /// Fails fast while the enrichment service keeps failing.
    pub breaker: EnrichmentCircuitBreaker,
    /// Record-level deduplication cache to prevent concurrent enrichment of
    /// the same record. Value is the unix timestamp the run started.
    pub processing_records_cache: Cache<String, i64>,
}

/// Workflow routes. Rate limiting is layered on by the caller.
pub fn workflow_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/workflow/enrich", post(workflow_enrich))
        .with_state(state)
}

/// Every route served by the application.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(workflow_routes(state))
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "hint-enrichment",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/workflow/enrich
///
/// Called by the workflow engine when a flow reaches a data enrichment
/// task. Enriches the posted record, applies the fields it accepts and
/// returns the updated record together with the routing decision.
pub async fn workflow_enrich(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<WorkflowEnrichRequest>,
) -> Result<Json<WorkflowEnrichResponse>, AppError> {
    validate_webhook_secret(&state, &headers)?;

    let WorkflowEnrichRequest {
        flow_id,
        external_action,
        mut record,
    } = payload;

    if record.id.trim().is_empty() {
        return Err(AppError::BadRequest("record.id is required".to_string()));
    }

    tracing::info!(
        "Workflow {} enrichment for {} {}",
        flow_id,
        record.module,
        record.id
    );

    let key = format!("{}:{}", record.module, record.id);
    let now = chrono::Utc::now().timestamp();
    let entry = state
        .processing_records_cache
        .entry(key.clone())
        .or_insert(now)
        .await;
    if !entry.is_fresh() {
        let seconds_ago = now - entry.into_value();
        tracing::warn!(
            "⏭ Record {} already being enriched ({} seconds ago)",
            key,
            seconds_ago
        );
        return Err(AppError::Conflict(format!(
            "Record already being enriched (started {} seconds ago)",
            seconds_ago
        )));
    }

    let in_flight = InFlightGuard {
        cache: state.processing_records_cache.clone(),
        key: Some(key),
    };

    let deadline = Duration::from_secs(state.config.enrich_deadline_secs);
    let is_failure = |e: &EnrichmentError| matches!(e, EnrichmentError::TransportError(_));

    let outcome = state
        .breaker
        .call_with(is_failure, async {
            let task =
                run_enrichment_task(&state.client, &mut record, external_action.as_deref(), deadline)
                    .await;
            task.applied.map(|applied| (task.flow, applied))
        })
        .await;

    in_flight.release().await;

    let (flow, applied) = match outcome {
        Ok(done) => done,
        Err(failsafe::Error::Inner(e)) => return Err(e.into()),
        Err(failsafe::Error::Rejected) => {
            return Err(AppError::ServiceUnavailable(
                "Enrichment service is failing, try again later".to_string(),
            ))
        }
    };

    let status = if applied.is_empty() {
        "unchanged"
    } else {
        "enriched"
    };

    Ok(Json(WorkflowEnrichResponse {
        status: status.to_string(),
        flow_id,
        route_action: flow.route_action,
        flow_action: flow.flow_action,
        applied,
        record,
        processed_at: chrono::Utc::now().to_rfc3339(),
    }))
}

/// Clears a record's in-flight marker. If the request future is dropped
/// before [`InFlightGuard::release`] runs, the marker is cleared from a
/// spawned task instead.
struct InFlightGuard {
    cache: Cache<String, i64>,
    key: Option<String>,
}

impl InFlightGuard {
    async fn release(mut self) {
        if let Some(key) = self.key.take() {
            self.cache.invalidate(&key).await;
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };
        tracing::warn!("Enrichment of {} abandoned, releasing record", key);
        let cache = self.cache.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                cache.invalidate(&key).await;
            });
        }
    }
}

/// Validate shared secret from X-Webhook-Token header
fn validate_webhook_secret(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(ref expected_secret) = state.config.webhook_secret else {
        return Ok(());
    };

    let token = headers
        .get("x-webhook-token")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing X-Webhook-Token header".to_string()))?;

    if !constant_time_compare(token, expected_secret) {
        tracing::warn!("Invalid webhook token received");
        return Err(AppError::Unauthorized("Invalid webhook token".to_string()));
    }

    Ok(())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
