//! Type definitions for execution diagnosis.

use std::fmt;

use flowdoctor_models::{ExecutionStatus, LogEntry, NodeRecord};
use serde::Serialize;

/// How urgently an issue needs the user's attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Nothing is wrong; there is just nothing to report
    Info,
    /// Minor or user-initiated
    Low,
    /// Likely transient or tunable
    Medium,
    /// The automation will keep failing until something changes
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad grouping of issue kinds, used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueFamily {
    Network,
    Blockchain,
    Configuration,
    Execution,
    Unknown,
}

/// Classification tag of a single issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NoExecutions,
    ExecutionError,
    Cancelled,
    Network,
    InsufficientFunds,
    Slippage,
    Reverted,
    MissingVariable,
    MissingInput,
    Foreach,
    Unknown,
}

impl IssueKind {
    /// Wire tag, e.g. `insufficient_funds`.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::NoExecutions => "no_executions",
            IssueKind::ExecutionError => "execution_error",
            IssueKind::Cancelled => "cancelled",
            IssueKind::Network => "network",
            IssueKind::InsufficientFunds => "insufficient_funds",
            IssueKind::Slippage => "slippage",
            IssueKind::Reverted => "reverted",
            IssueKind::MissingVariable => "missing_variable",
            IssueKind::MissingInput => "missing_input",
            IssueKind::Foreach => "foreach",
            IssueKind::Unknown => "unknown",
        }
    }

    pub fn family(&self) -> IssueFamily {
        match self {
            IssueKind::Network => IssueFamily::Network,
            IssueKind::InsufficientFunds | IssueKind::Slippage | IssueKind::Reverted => {
                IssueFamily::Blockchain
            }
            IssueKind::MissingVariable | IssueKind::MissingInput | IssueKind::Foreach => {
                IssueFamily::Configuration
            }
            IssueKind::NoExecutions | IssueKind::ExecutionError | IssueKind::Cancelled => {
                IssueFamily::Execution
            }
            IssueKind::Unknown => IssueFamily::Unknown,
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified problem found in an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub message: String,
    pub fix: String,
    pub retryable: bool,
    pub severity: Severity,
}

impl Issue {
    pub fn new(
        kind: IssueKind,
        message: impl Into<String>,
        fix: impl Into<String>,
        retryable: bool,
        severity: Severity,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            fix: fix.into(),
            retryable,
            severity,
        }
    }
}

/// Result of diagnosing one execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    /// Issues in the order they were produced. Never empty.
    pub issues: Vec<Issue>,
    /// Node the failing log entry points at, when it could be resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failing_node: Option<NodeRecord>,
    /// First log entry with an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failing_log: Option<LogEntry>,
    /// Status of the diagnosed execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionStatus>,
    /// Raw start time of the diagnosed execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
}

impl Diagnosis {
    /// Whether there was no execution to diagnose.
    pub fn is_empty_history(&self) -> bool {
        self.issues
            .first()
            .map(|i| i.kind == IssueKind::NoExecutions)
            .unwrap_or(false)
    }

    /// The first issue produced.
    pub fn primary(&self) -> Option<&Issue> {
        self.issues.first()
    }

    /// True when every issue is retryable.
    pub fn is_retryable(&self) -> bool {
        !self.issues.is_empty() && self.issues.iter().all(|i| i.retryable)
    }

    pub fn highest_severity(&self) -> Severity {
        self.issues
            .iter()
            .map(|i| i.severity)
            .max()
            .unwrap_or(Severity::Info)
    }

    pub fn kinds(&self) -> Vec<IssueKind> {
        self.issues.iter().map(|i| i.kind).collect()
    }
}
