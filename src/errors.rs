use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Failures surfaced by an enrichment call.
///
/// Unsupported subjects, "not enriched" replies and malformed bodies are not
/// errors; they resolve to an empty [`crate::models::AppliedFields`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentError {
    /// The credential provider could not issue an access token.
    AuthError(String),
    /// The enrichment service answered 401. The caller may resume later.
    AuthInvalid,
    /// Connection, timeout, DNS or unexpected status from the service.
    TransportError(String),
    /// The call did not finish before the caller's deadline.
    DeadlineExceeded,
    /// The target record could not be persisted after applying fields.
    Persist(String),
}

impl fmt::Display for EnrichmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrichmentError::AuthError(msg) => write!(f, "Credential error: {}", msg),
            EnrichmentError::AuthInvalid => write!(f, "Authentication invalid"),
            EnrichmentError::TransportError(msg) => write!(f, "Transport error: {}", msg),
            EnrichmentError::DeadlineExceeded => write!(f, "Enrichment deadline exceeded"),
            EnrichmentError::Persist(msg) => write!(f, "Persist error: {}", msg),
        }
    }
}

impl std::error::Error for EnrichmentError {}

/// Errors returned by the HTTP surface.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Unauthorized access error.
    Unauthorized(String),
    /// The same record is already being enriched.
    Conflict(String),
    /// The enrichment service is failing fast.
    ServiceUnavailable(String),
    /// Enrichment failed.
    Enrichment(EnrichmentError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            AppError::Enrichment(e) => write!(f, "Enrichment failed: {}", e),
        }
    }
}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status code and JSON body.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized access: {}", msg);
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            AppError::Enrichment(EnrichmentError::AuthInvalid) => (
                StatusCode::UNAUTHORIZED,
                "Enrichment service rejected credentials".to_string(),
            ),
            AppError::Enrichment(EnrichmentError::DeadlineExceeded) => (
                StatusCode::GATEWAY_TIMEOUT,
                "Enrichment deadline exceeded".to_string(),
            ),
            AppError::Enrichment(e) => {
                tracing::error!("Enrichment error: {}", e);
                (StatusCode::BAD_GATEWAY, "External service error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<EnrichmentError> for AppError {
    fn from(err: EnrichmentError) -> Self {
        AppError::Enrichment(err)
    }
}
