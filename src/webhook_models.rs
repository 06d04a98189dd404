use crate::models::Record;
use crate::workflow::FlowAction;
use serde::{Deserialize, Serialize};

/// Body posted by the workflow engine when it reaches an enrichment task.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowEnrichRequest {
    pub flow_id: String,
    #[serde(default)]
    pub external_action: Option<String>,
    pub record: Record,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowEnrichResponse {
    pub status: String,
    pub flow_id: String,
    pub route_action: &'static str,
    pub flow_action: FlowAction,
    pub applied: Vec<String>,
    pub record: Record,
    pub processed_at: String,
}
