use crate::errors::EnrichmentError;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Re-sends after a "not enriched" reply, on top of the first attempt.
pub const MAX_RETRIES: u32 = 2;

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl TransportRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

/// What came back from the last attempt.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// Lower-cased header names; a repeated header keeps its last value.
    pub headers: HashMap<String, String>,
    pub body: String,
    /// `None` when the body is not JSON.
    pub json: Option<Value>,
    pub attempts: u32,
}

impl TransportResponse {
    pub fn is_enriched(&self) -> bool {
        self.json
            .as_ref()
            .and_then(|j| j.get("enriched"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub enum TransportOutcome {
    /// The service answered with a 2xx status.
    Completed(TransportResponse),
    /// The service answered 401. Never retried.
    AuthInvalid,
    /// Connection failure or a non-2xx status other than 401.
    Failed(String),
}

/// HTTP sender that re-attempts while the service reports the subject as
/// not yet enriched.
///
/// The retry count lives inside a single [`RetryableTransport::send`] call,
/// so concurrent or consecutive calls never share an exhausted budget.
#[derive(Clone)]
pub struct RetryableTransport {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl RetryableTransport {
    pub fn new(timeout: Duration, retry_delay: Duration) -> Result<Self, EnrichmentError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            EnrichmentError::TransportError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self::with_client(client, retry_delay))
    }

    pub fn with_client(client: Client, retry_delay: Duration) -> Self {
        Self {
            client,
            max_retries: MAX_RETRIES,
            retry_delay,
        }
    }

    /// Sends `request`, retrying up to [`MAX_RETRIES`] times while a 200 JSON
    /// reply does not carry `enriched: true` and `allow_retry` is set.
    pub async fn send(&self, request: &TransportRequest, allow_retry: bool) -> TransportOutcome {
        let mut retries = 0;

        loop {
            let mut response = match self.send_once(request).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!("Enrichment request failed: {}", e);
                    return TransportOutcome::Failed(e);
                }
            };
            response.attempts = retries + 1;

            if response.status == StatusCode::UNAUTHORIZED.as_u16() {
                tracing::warn!("Enrichment service returned 401, not retrying");
                return TransportOutcome::AuthInvalid;
            }

            if !(200..300).contains(&response.status) {
                tracing::error!(
                    "Enrichment service returned {}: {}",
                    response.status,
                    response.body
                );
                return TransportOutcome::Failed(format!(
                    "Enrichment service returned status {}: {}",
                    response.status, response.body
                ));
            }

            let retryable = response.status == StatusCode::OK.as_u16()
                && response.json.is_some()
                && !response.is_enriched();
            if !retryable || !allow_retry || retries >= self.max_retries {
                return TransportOutcome::Completed(response);
            }

            retries += 1;
            tracing::warn!(
                "Subject not enriched yet, retry {}/{}",
                retries,
                self.max_retries
            );
            if !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
    }

    async fn send_once(&self, request: &TransportRequest) -> Result<TransportResponse, String> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(ref body) = request.body {
            if !request.has_header(CONTENT_TYPE.as_str()) {
                builder = builder.header(CONTENT_TYPE, "application/json");
            }
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let body = response.text().await.map_err(|e| e.to_string())?;
        let json = serde_json::from_str(&body).ok();

        Ok(TransportResponse {
            status,
            headers,
            body,
            json,
            attempts: 1,
        })
    }
}

/// Flattens a header map. Later values of a repeated header overwrite
/// earlier ones.
pub fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for (name, value) in headers {
        out.insert(
            name.as_str().to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }
    out
}
