//! Builder patterns for assembling records in code.
//!
//! The platform is the source of truth for these records; builders exist for
//! tests and for the CLI's offline mode.

use serde_json::Value;

use crate::automation::{AutomationRecord, Definition, NodeRecord};
use crate::execution::{ExecutionRecord, ExecutionStatus, LogEntry};

/// Builder for ExecutionRecord instances with a fluent API.
#[derive(Debug, Clone, Default)]
pub struct ExecutionBuilder {
    record: ExecutionRecord,
}

impl ExecutionBuilder {
    /// Creates a builder for an execution with the given status.
    pub fn new(status: impl Into<ExecutionStatus>) -> Self {
        Self {
            record: ExecutionRecord {
                status: status.into(),
                ..Default::default()
            },
        }
    }

    /// Sets the top-level error.
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.record.error = Some(error.into());
        self
    }

    /// Sets the raw start timestamp.
    pub fn started_at(mut self, started_at: impl Into<String>) -> Self {
        self.record.started_at = Some(started_at.into());
        self
    }

    /// Appends a log entry that completed without error.
    pub fn ok_log(mut self, node_id: impl Into<String>) -> Self {
        self.record.logs.push(LogEntry {
            node_id: node_id.into(),
            ..Default::default()
        });
        self
    }

    /// Appends a log entry that failed with `error`.
    pub fn failed_log(mut self, node_id: impl Into<String>, error: impl Into<String>) -> Self {
        self.record.logs.push(LogEntry {
            node_id: node_id.into(),
            error: Some(error.into()),
            ..Default::default()
        });
        self
    }

    /// Sets the output of the most recently added log entry.
    pub fn with_output(mut self, output: Value) -> Self {
        if let Some(log) = self.record.logs.last_mut() {
            log.output = Some(output);
        }
        self
    }

    /// Sets the input of the most recently added log entry.
    pub fn with_input(mut self, input: Value) -> Self {
        if let Some(log) = self.record.logs.last_mut() {
            log.input = Some(input);
        }
        self
    }

    /// Embeds a definition snapshot in the execution.
    pub fn definition(mut self, nodes: Vec<NodeRecord>) -> Self {
        self.record.definition = Some(Definition {
            nodes,
            ..Default::default()
        });
        self
    }

    /// Builds the ExecutionRecord.
    pub fn build(self) -> ExecutionRecord {
        self.record
    }
}

/// Builder for AutomationRecord instances.
#[derive(Debug, Clone, Default)]
pub struct AutomationBuilder {
    record: AutomationRecord,
}

impl AutomationBuilder {
    /// Creates a builder for the automation with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            record: AutomationRecord {
                id: id.into(),
                ..Default::default()
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.record.name = Some(name.into());
        self
    }

    /// Adds a node to the definition.
    pub fn node(mut self, node: NodeRecord) -> Self {
        self.record
            .definition
            .get_or_insert_with(Definition::default)
            .nodes
            .push(node);
        self
    }

    /// Appends an execution; add the newest first.
    pub fn execution(mut self, execution: ExecutionRecord) -> Self {
        self.record.executions.push(execution);
        self
    }

    pub fn build(self) -> AutomationRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execution_builder() {
        let exec = ExecutionBuilder::new("FAILED")
            .started_at("2026-01-01T00:00:00Z")
            .ok_log("n1")
            .failed_log("n2", "boom")
            .with_output(json!({"userMessage": "Something broke"}))
            .with_input(json!({"amount": 5}))
            .build();

        assert_eq!(exec.status, ExecutionStatus::Failed);
        assert_eq!(exec.logs.len(), 2);
        assert_eq!(exec.logs[1].user_message(), Some("Something broke"));
        assert_eq!(exec.logs[1].input, Some(json!({"amount": 5})));
        assert!(exec.logs[0].output.is_none());
    }

    #[test]
    fn test_automation_builder() {
        let automation = AutomationBuilder::new("abc")
            .name("Test")
            .node(NodeRecord::new("n1", "swap"))
            .execution(ExecutionBuilder::new("SUCCESS").build())
            .build();

        assert_eq!(automation.id, "abc");
        assert_eq!(automation.display_name(), "Test");
        assert_eq!(automation.nodes().len(), 1);
        assert!(automation.latest_execution().unwrap().status.is_success());
    }
}
