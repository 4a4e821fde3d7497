//! Response DTOs for the API.

use chrono::{DateTime, Utc};
use flowdoctor_core::Diagnosis;
use flowdoctor_models::{AutomationRecord, Definition, ExecutionRecord, NodeRecord};
use serde::Serialize;
use serde_json::Value;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

/// Diagnosis of the latest execution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugResponse {
    pub automation_id: String,
    /// Assistant explanation, or the plain report when unavailable.
    pub analysis: String,
    /// Rule-based report.
    pub report: String,
    pub diagnosis: Diagnosis,
}

/// Full automation record tagged with the requested id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationResponse {
    pub automation_id: String,
    #[serde(flatten)]
    pub automation: AutomationRecord,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionResponse {
    pub automation_id: String,
    pub definition: Option<Definition>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionsResponse {
    pub automation_id: String,
    pub executions: Vec<ExecutionRecord>,
}

/// A node reduced to its type and configuration.
#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub config: Value,
}

impl From<&NodeRecord> for NodeView {
    fn from(node: &NodeRecord) -> Self {
        Self {
            id: node.id.clone(),
            node_type: node.node_type.clone(),
            config: node.config(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodesResponse {
    pub automation_id: String,
    pub nodes: Vec<NodeView>,
}
