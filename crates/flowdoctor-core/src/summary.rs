//! Run statistics for an automation.

use flowdoctor_models::{AutomationRecord, ExecutionStatus};
use serde::Serialize;

/// Quick overview of an automation's recent runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationSummary {
    pub automation_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_status: Option<ExecutionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_error: Option<String>,
    pub total_runs: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Percentage of successful runs with one decimal, e.g. `66.7%`.
    pub success_rate: String,
}

impl AutomationSummary {
    pub fn from_record(automation: &AutomationRecord) -> Self {
        let executions = &automation.executions;
        let success_count = executions.iter().filter(|e| e.status.is_success()).count();
        let failure_count = executions.iter().filter(|e| e.status.is_failed()).count();
        let latest = automation.latest_execution();

        Self {
            automation_id: automation.id.clone(),
            name: automation.display_name().to_string(),
            latest_status: latest.map(|e| e.status.clone()),
            latest_error: latest.and_then(|e| e.error.clone()),
            total_runs: executions.len(),
            success_count,
            failure_count,
            success_rate: success_rate(success_count, executions.len()),
        }
    }
}

/// Format `successes / total` as a percentage; zero runs is `0.0%`.
pub fn success_rate(successes: usize, total: usize) -> String {
    let rate = successes as f64 / total.max(1) as f64 * 100.0;
    format!("{rate:.1}%")
}
