use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub hint_service_url: String,
    pub hint_token_url: String,
    pub hint_instance_id: String,
    pub hint_license_key: String,
    pub request_timeout_secs: u64,
    pub retry_delay_ms: u64,
    pub enrich_deadline_secs: u64,
    pub webhook_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            hint_service_url: required_url("HINT_SERVICE_URL")?,
            hint_token_url: required_url("HINT_TOKEN_URL")?,
            hint_instance_id: required("HINT_INSTANCE_ID")?,
            hint_license_key: required("HINT_LICENSE_KEY")?,
            request_timeout_secs: std::env::var("HINT_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HINT_REQUEST_TIMEOUT_SECS must be a number"))?,
            retry_delay_ms: std::env::var("HINT_RETRY_DELAY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HINT_RETRY_DELAY_MS must be a number"))?,
            enrich_deadline_secs: std::env::var("HINT_ENRICH_DEADLINE_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HINT_ENRICH_DEADLINE_SECS must be a number"))?,
            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Hint service URL: {}", config.hint_service_url);
        tracing::debug!("Hint token URL: {}", config.hint_token_url);
        tracing::debug!("Request timeout: {}s", config.request_timeout_secs);
        if config.webhook_secret.is_none() {
            tracing::warn!("WEBHOOK_SECRET not set, workflow endpoint accepts unauthenticated calls");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    let value = std::env::var(name)
        .map_err(|_| anyhow::anyhow!("{} environment variable required", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    Ok(value)
}

fn required_url(name: &str) -> anyhow::Result<String> {
    let url = required(name)?;
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_url_rejects_other_schemes() {
        std::env::set_var("HINT_TEST_BAD_URL", "ftp://hint.example.com");
        assert!(required_url("HINT_TEST_BAD_URL").is_err());
    }

    #[test]
    fn test_required_url_trims_trailing_slash() {
        std::env::set_var("HINT_TEST_GOOD_URL", "https://hint.example.com/");
        assert_eq!(
            required_url("HINT_TEST_GOOD_URL").unwrap(),
            "https://hint.example.com"
        );
    }

    #[test]
    fn test_required_rejects_blank() {
        std::env::set_var("HINT_TEST_BLANK", "   ");
        assert!(required("HINT_TEST_BLANK").is_err());
        assert!(required("HINT_TEST_DEFINITELY_UNSET").is_err());
    }
}
