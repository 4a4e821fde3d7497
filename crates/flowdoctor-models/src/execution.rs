//! Execution records and per-node log entries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::automation::Definition;
use crate::lenient::{lenient_text, lenient_timestamp, null_as_default};

/// Status of one run of an automation.
///
/// Statuses the platform may add later are kept verbatim in `Other`.
/// A null or non-string status decodes as the default.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Cancelled,
    Running,
    Other(String),
}

impl ExecutionStatus {
    /// Upstream spelling of the status.
    pub fn as_str(&self) -> &str {
        match self {
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::Cancelled => "CANCELLED",
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Other(s) => s,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Success)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ExecutionStatus::Failed)
    }
}

impl Default for ExecutionStatus {
    fn default() -> Self {
        ExecutionStatus::Other("UNKNOWN".to_string())
    }
}

impl From<String> for ExecutionStatus {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => ExecutionStatus::Success,
            "FAILED" => ExecutionStatus::Failed,
            "CANCELLED" | "CANCELED" => ExecutionStatus::Cancelled,
            "RUNNING" => ExecutionStatus::Running,
            _ => ExecutionStatus::Other(s),
        }
    }
}

impl<'de> Deserialize<'de> for ExecutionStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => ExecutionStatus::from(s),
            _ => ExecutionStatus::default(),
        })
    }
}

impl From<&str> for ExecutionStatus {
    fn from(s: &str) -> Self {
        ExecutionStatus::from(s.to_string())
    }
}

impl From<ExecutionStatus> for String {
    fn from(status: ExecutionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One run of an automation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    /// Execution identifier, when the platform exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub status: ExecutionStatus,

    /// Top-level failure reported for the whole run.
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,

    /// Start time as delivered (RFC 3339 normally).
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub started_at: Option<String>,

    /// Per-node log entries in execution order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub logs: Vec<LogEntry>,

    /// Snapshot of the definition this run executed, when embedded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Definition>,
}

impl ExecutionRecord {
    /// Parsed start time, if the raw value is RFC 3339.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// The first log entry whose error is present, even if empty.
    pub fn failing_log(&self) -> Option<&LogEntry> {
        self.logs.iter().find(|log| log.error.is_some())
    }
}

/// Log output of one node during an execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Node this entry belongs to.
    #[serde(default)]
    pub node_id: String,

    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,

    /// Input the node was run with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,

    /// Free-form node output; may carry `userMessage` and `revertReason`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl LogEntry {
    /// `output.userMessage`, if present and non-empty.
    pub fn user_message(&self) -> Option<&str> {
        self.output_str("userMessage")
    }

    /// `output.revertReason`, if present and non-empty.
    pub fn revert_reason(&self) -> Option<&str> {
        self.output_str("revertReason")
    }

    fn output_str(&self, key: &str) -> Option<&str> {
        self.output
            .as_ref()
            .and_then(|o| o.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}
