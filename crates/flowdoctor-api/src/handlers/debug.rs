//! Diagnosis handler.

use axum::{
    extract::{Path, State},
    Json,
};
use flowdoctor_core::{render_report, Diagnoser, ReportFormat};
use tracing::info;

use crate::error::Result;
use crate::state::AppState;
use crate::types::DebugResponse;

/// GET /api/debug/:id - Diagnose the latest execution of an automation.
pub async fn debug_automation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DebugResponse>> {
    let automation = state.automation(&id).await?;
    let diagnosis = Diagnoser::new().diagnose_latest(&automation);

    info!(
        automation_id = %id,
        issues = diagnosis.issues.len(),
        severity = %diagnosis.highest_severity(),
        "Diagnosed automation"
    );

    let report = render_report(&automation, &diagnosis, ReportFormat::Plain);
    let analysis = state
        .assistant
        .explain_or_fallback(&automation, &diagnosis, ReportFormat::Plain)
        .await;

    Ok(Json(DebugResponse {
        automation_id: id,
        analysis,
        report,
        diagnosis,
    }))
}
