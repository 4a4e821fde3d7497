//! Read-only projections of an automation.

use axum::{
    extract::{Path, State},
    Json,
};
use flowdoctor_core::AutomationSummary;

use crate::error::Result;
use crate::state::AppState;
use crate::types::{
    AutomationResponse, DefinitionResponse, ExecutionsResponse, NodeView, NodesResponse,
};

/// GET /api/automation/:id - Full automation record.
pub async fn get_automation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AutomationResponse>> {
    let automation = state.automation(&id).await?;
    Ok(Json(AutomationResponse {
        automation_id: id,
        automation,
    }))
}

/// GET /api/automation/:id/definition - Definition only.
pub async fn get_definition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DefinitionResponse>> {
    let automation = state.automation(&id).await?;
    Ok(Json(DefinitionResponse {
        automation_id: id,
        definition: automation.definition,
    }))
}

/// GET /api/automation/:id/executions - Execution history.
pub async fn get_executions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExecutionsResponse>> {
    let automation = state.automation(&id).await?;
    Ok(Json(ExecutionsResponse {
        automation_id: id,
        executions: automation.executions,
    }))
}

/// GET /api/automation/:id/nodes - Node types and configs.
pub async fn get_nodes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NodesResponse>> {
    let automation = state.automation(&id).await?;
    let nodes = automation.nodes().iter().map(NodeView::from).collect();
    Ok(Json(NodesResponse {
        automation_id: id,
        nodes,
    }))
}

/// GET /api/automation/:id/summary - Run statistics.
pub async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AutomationSummary>> {
    let automation = state.automation(&id).await?;
    let mut summary = AutomationSummary::from_record(&automation);
    summary.automation_id = id;
    Ok(Json(summary))
}
