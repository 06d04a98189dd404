use crate::config::Config;
use crate::errors::EnrichmentError;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

/// Source of the access token and static identity used to call the
/// enrichment service.
pub trait CredentialProvider: Send + Sync {
    /// Issues a fresh short-lived token. Called once per enrichment.
    fn new_access_token(&self) -> impl Future<Output = Result<String, EnrichmentError>> + Send;

    fn service_url(&self) -> &str;

    fn instance_id(&self) -> &str;

    fn license_key(&self) -> &str;

    /// `Basic base64(instance_id:license_key)`.
    fn basic_authorization(&self) -> String {
        basic_authorization(self.instance_id(), self.license_key())
    }
}

pub fn basic_authorization(instance_id: &str, license_key: &str) -> String {
    format!("Basic {}", B64.encode(format!("{}:{}", instance_id, license_key)))
}

#[derive(Debug, Deserialize)]
struct TokenReply {
    #[serde(alias = "access_token", rename = "accessToken")]
    access_token: String,
}

/// Fetches access tokens from the instance's token endpoint.
#[derive(Clone)]
pub struct TokenService {
    client: Client,
    token_url: String,
    service_url: String,
    instance_id: String,
    license_key: String,
}

impl TokenService {
    pub fn new(config: &Config) -> Result<Self, EnrichmentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                EnrichmentError::AuthError(format!("Failed to create token client: {}", e))
            })?;

        Ok(Self {
            client,
            token_url: config.hint_token_url.clone(),
            service_url: config.hint_service_url.clone(),
            instance_id: config.hint_instance_id.clone(),
            license_key: config.hint_license_key.clone(),
        })
    }
}

impl CredentialProvider for TokenService {
    async fn new_access_token(&self) -> Result<String, EnrichmentError> {
        tracing::debug!("Requesting access token from {}", self.token_url);

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.instance_id, Some(&self.license_key))
            .send()
            .await
            .map_err(|e| EnrichmentError::AuthError(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EnrichmentError::AuthError(format!(
                "Token endpoint returned {}: {}",
                status, error_text
            )));
        }

        let reply: TokenReply = response.json().await.map_err(|e| {
            EnrichmentError::AuthError(format!("Failed to parse token response: {}", e))
        })?;

        if reply.access_token.trim().is_empty() {
            return Err(EnrichmentError::AuthError(
                "Token endpoint returned an empty token".to_string(),
            ));
        }

        Ok(reply.access_token)
    }

    fn service_url(&self) -> &str {
        &self.service_url
    }

    fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn license_key(&self) -> &str {
        &self.license_key
    }
}
