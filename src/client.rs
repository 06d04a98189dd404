use crate::credentials::CredentialProvider;
use crate::errors::EnrichmentError;
use crate::field_mapping::{FieldMappingRules, HINT_RULES};
use crate::models::{AppliedFields, EnrichmentRequest, EnrichmentResponse, Subject, SubjectSource, TargetRecord};
use crate::transport::{RetryableTransport, TransportOutcome, TransportRequest};
use std::time::Duration;
use url::Url;

/// Endpoint appended to the configured service URL.
pub const ENRICH_PATH: &str = "/v1/enrich-person-bean";

/// Client for the Hint person/company enrichment endpoint.
///
/// Holds no per-call state; one instance can serve concurrent enrichments.
pub struct EnrichmentClient<C> {
    credentials: C,
    transport: RetryableTransport,
    rules: &'static FieldMappingRules,
}

impl<C: CredentialProvider> EnrichmentClient<C> {
    pub fn new(credentials: C, transport: RetryableTransport) -> Self {
        Self {
            credentials,
            transport,
            rules: &HINT_RULES,
        }
    }

    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    /// `{service_url}/v1/enrich-person-bean?bean=<json>`
    pub fn build_url(&self, request: &EnrichmentRequest) -> Result<Url, EnrichmentError> {
        let payload = serde_json::to_string(request).map_err(|e| {
            EnrichmentError::TransportError(format!("Failed to encode request: {}", e))
        })?;

        Url::parse_with_params(
            &format!(
                "{}{}",
                self.credentials.service_url().trim_end_matches('/'),
                ENRICH_PATH
            ),
            &[("bean", payload.as_str())],
        )
        .map_err(|e| EnrichmentError::TransportError(format!("Failed to build URL: {}", e)))
    }

    /// Enriches a host record. Records that are neither people nor
    /// organizations resolve to an empty result without any network call.
    pub async fn enrich<S: SubjectSource + ?Sized>(
        &self,
        record: &S,
    ) -> Result<AppliedFields, EnrichmentError> {
        match record.subject() {
            Some(subject) => self.enrich_subject(&subject).await,
            None => {
                tracing::debug!("Record type is not enrichable, skipping");
                Ok(AppliedFields::default())
            }
        }
    }

    pub async fn enrich_subject(&self, subject: &Subject) -> Result<AppliedFields, EnrichmentError> {
        let request = subject.to_request();

        let token = self.credentials.new_access_token().await?;
        let url = self.build_url(&request)?;

        let outbound = TransportRequest::get(url)
            .header("authToken", token)
            .header("Authorization", self.credentials.basic_authorization());

        tracing::info!("Requesting {} enrichment", subject.kind());

        let response = match self.transport.send(&outbound, true).await {
            TransportOutcome::Completed(response) => response,
            TransportOutcome::AuthInvalid => return Err(EnrichmentError::AuthInvalid),
            TransportOutcome::Failed(e) => return Err(EnrichmentError::TransportError(e)),
        };

        let parsed = match response.json.as_ref().and_then(EnrichmentResponse::from_json) {
            Some(parsed) if parsed.enriched => parsed,
            Some(_) => {
                tracing::warn!(
                    "No enrichment available after {} attempt(s)",
                    response.attempts
                );
                return Ok(AppliedFields::default());
            }
            None => {
                tracing::warn!("Malformed enrichment response, applying nothing");
                return Ok(AppliedFields::default());
            }
        };

        let fields = self.rules.translate(&parsed);
        tracing::info!(
            "✓ {} enriched with {} field(s) after {} attempt(s)",
            subject.kind(),
            fields.len(),
            response.attempts
        );
        Ok(fields)
    }

    /// Enriches `record`, writes the fields it accepts and persists it once.
    /// Returns the attributes that were written.
    pub async fn enrich_record<R>(&self, record: &mut R) -> Result<Vec<String>, EnrichmentError>
    where
        R: SubjectSource + TargetRecord + ?Sized,
    {
        let fields = self.enrich(&*record).await?;
        apply_and_persist(&fields, record)
    }

    /// Like [`EnrichmentClient::enrich_record`] but gives up after
    /// `deadline`. Nothing is applied when the deadline passes.
    pub async fn enrich_with_deadline<R>(
        &self,
        record: &mut R,
        deadline: Duration,
    ) -> Result<Vec<String>, EnrichmentError>
    where
        R: SubjectSource + TargetRecord + ?Sized,
    {
        let fields = tokio::time::timeout(deadline, self.enrich(&*record))
            .await
            .map_err(|_| EnrichmentError::DeadlineExceeded)??;
        apply_and_persist(&fields, record)
    }
}

fn apply_and_persist<R: TargetRecord + ?Sized>(
    fields: &AppliedFields,
    record: &mut R,
) -> Result<Vec<String>, EnrichmentError> {
    if fields.is_empty() {
        return Ok(Vec::new());
    }

    let applied = fields.apply_to(record);
    record.persist()?;

    tracing::info!("Applied {} of {} enriched field(s)", applied.len(), fields.len());
    Ok(applied)
}
