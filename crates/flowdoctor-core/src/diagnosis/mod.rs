//! Execution failure diagnosis.
//!
//! Turns one execution record (plus its parent automation) into a
//! [`Diagnosis`]: a list of classified issues, the failing node and the
//! failing log entry. The logic is pure and never fails; missing or odd
//! fields degrade to an `unknown` issue.
//!
//! # Pipeline
//!
//! 1. **History check** - no execution at all is its own terminal case
//! 2. **Failure location** - the first log entry with an error, even an
//!    empty one, is authoritative
//! 3. **Run-level fallback** - without a failing entry, the top-level error
//!    or status decides
//! 4. **Node resolution** - match the entry's node id against the definition
//! 5. **Rule classification** - every matching rule adds an issue
//! 6. **Fallback** - no match yields a single `unknown` issue

pub mod render;
mod rules;
mod types;

use flowdoctor_models::{AutomationRecord, ExecutionRecord, ExecutionStatus, NodeRecord};
use tracing::debug;

pub use self::render::{render_not_found, render_report, ReportFormat, INPUT_PREVIEW_LIMIT};
pub use self::rules::{
    classify_error, default_rules, unclassified_issue, MessageSource, Rule, RuleSpec, RULE_SPECS,
};
pub use self::types::{Diagnosis, Issue, IssueFamily, IssueKind, Severity};

/// Rule-based diagnoser for automation executions.
///
/// Holds a compiled rule table; the default table is shared and compiled once.
#[derive(Debug, Clone, Copy)]
pub struct Diagnoser<'r> {
    rules: &'r [Rule],
}

impl Default for Diagnoser<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnoser<'static> {
    /// Diagnoser using the default rule table.
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl<'r> Diagnoser<'r> {
    /// Diagnoser using a custom rule table.
    pub fn with_rules(rules: &'r [Rule]) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        self.rules
    }

    /// Diagnose the newest execution of `automation`.
    pub fn diagnose_latest(&self, automation: &AutomationRecord) -> Diagnosis {
        self.diagnose(automation.latest_execution(), automation)
    }

    /// Diagnose `execution`, which belongs to `automation`.
    pub fn diagnose(
        &self,
        execution: Option<&ExecutionRecord>,
        automation: &AutomationRecord,
    ) -> Diagnosis {
        let Some(execution) = execution else {
            return Diagnosis {
                issues: vec![Issue::new(
                    IssueKind::NoExecutions,
                    "No executions found for this automation",
                    "Run the automation at least once, then ask again",
                    false,
                    Severity::Info,
                )],
                failing_node: None,
                failing_log: None,
                status: None,
                started_at: None,
            };
        };

        let mut diagnosis = Diagnosis {
            issues: Vec::new(),
            failing_node: None,
            failing_log: None,
            status: Some(execution.status.clone()),
            started_at: execution.started_at.clone(),
        };

        let Some(failing_log) = execution.failing_log() else {
            diagnosis.issues.push(run_level_issue(execution));
            return diagnosis;
        };

        diagnosis.failing_node = resolve_node(execution, automation, &failing_log.node_id);

        let error = failing_log.error.as_deref().unwrap_or_default();
        let mut issues = classify_error(self.rules, failing_log, error);
        if issues.is_empty() {
            issues.push(unclassified_issue(failing_log, error));
        }

        debug!(
            automation_id = %automation.id,
            node_id = %failing_log.node_id,
            node_resolved = diagnosis.failing_node.is_some(),
            issues = issues.len(),
            "Classified failing log entry"
        );

        diagnosis.issues = issues;
        diagnosis.failing_log = Some(failing_log.clone());
        diagnosis
    }
}

/// Diagnose with the default rule table.
pub fn diagnose(execution: Option<&ExecutionRecord>, automation: &AutomationRecord) -> Diagnosis {
    Diagnoser::new().diagnose(execution, automation)
}

/// Issue for an execution whose logs carry no error.
fn run_level_issue(execution: &ExecutionRecord) -> Issue {
    if let Some(error) = execution.error.as_deref().filter(|e| !e.is_empty()) {
        return Issue::new(
            IssueKind::ExecutionError,
            error,
            "Check the configuration of the step named in the error, then retry",
            false,
            Severity::High,
        );
    }

    if execution.status == ExecutionStatus::Cancelled {
        return Issue::new(
            IssueKind::Cancelled,
            "Execution was cancelled by user",
            "Run the automation again if the cancellation was unintended",
            false,
            Severity::Low,
        );
    }

    Issue::new(
        IssueKind::Unknown,
        "No clear failure point found",
        "Check the execution logs on the platform for more detail",
        false,
        Severity::Low,
    )
}

/// Find the node a log entry refers to.
///
/// The execution's own definition snapshot wins over the automation's
/// current definition.
fn resolve_node(
    execution: &ExecutionRecord,
    automation: &AutomationRecord,
    node_id: &str,
) -> Option<NodeRecord> {
    execution
        .definition
        .as_ref()
        .and_then(|d| d.find_node(node_id))
        .or_else(|| automation.find_node(node_id))
        .cloned()
}
