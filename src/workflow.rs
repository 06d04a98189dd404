//! Workflow script-task step that enriches the record a flow is running on.

use crate::client::EnrichmentClient;
use crate::credentials::CredentialProvider;
use crate::errors::EnrichmentError;
use crate::models::{SubjectSource, TargetRecord};
use serde::Serialize;
use std::time::Duration;

/// External action sent by the engine when a paused flow wakes up.
pub const RESUME_EXECUTION: &str = "RESUME_EXECUTION";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlowAction {
    Create,
    Update,
}

impl FlowAction {
    /// A resumed flow updates its existing row; anything else creates one.
    pub fn for_external_action(external_action: Option<&str>) -> Self {
        match external_action {
            Some(RESUME_EXECUTION) => FlowAction::Update,
            _ => FlowAction::Create,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowResponse {
    pub route_action: &'static str,
    pub flow_action: FlowAction,
}

/// Outcome of one script-task run.
#[derive(Debug)]
pub struct TaskResult {
    pub flow: FlowResponse,
    pub applied: Result<Vec<String>, EnrichmentError>,
}

/// Enriches `record` and tells the engine how to route the flow.
///
/// The flow is routed onwards whatever the enrichment outcome; the error is
/// handed back so the engine can decide whether to pause.
pub async fn run_enrichment_task<C, R>(
    client: &EnrichmentClient<C>,
    record: &mut R,
    external_action: Option<&str>,
    deadline: Duration,
) -> TaskResult
where
    C: CredentialProvider,
    R: SubjectSource + TargetRecord + ?Sized,
{
    let applied = client.enrich_with_deadline(record, deadline).await;
    if let Err(ref e) = applied {
        tracing::error!("Enrichment task failed: {}", e);
    }

    TaskResult {
        flow: FlowResponse {
            route_action: "ROUTE",
            flow_action: FlowAction::for_external_action(external_action),
        },
        applied,
    }
}
