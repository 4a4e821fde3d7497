//! Automation and node records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::execution::ExecutionRecord;
use crate::lenient::null_as_default;

/// A user-defined workflow as returned by the platform API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRecord {
    /// Platform identifier.
    #[serde(default)]
    pub id: String,

    /// Display name, if the user gave one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Node graph of the automation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Definition>,

    /// Execution history, newest first as delivered upstream.
    #[serde(default, deserialize_with = "null_as_default")]
    pub executions: Vec<ExecutionRecord>,

    /// Upstream fields without a typed counterpart (owner, timestamps).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AutomationRecord {
    /// Display name, falling back to "Unnamed".
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Unnamed")
    }

    /// Nodes of the definition (empty when the definition is missing).
    pub fn nodes(&self) -> &[NodeRecord] {
        self.definition
            .as_ref()
            .map(|d| d.nodes.as_slice())
            .unwrap_or(&[])
    }

    /// Find a node by id.
    pub fn find_node(&self, node_id: &str) -> Option<&NodeRecord> {
        self.nodes().iter().find(|n| n.id == node_id)
    }

    /// The newest execution, if any.
    pub fn latest_execution(&self) -> Option<&ExecutionRecord> {
        self.executions.first()
    }

    /// The newest `limit` executions in upstream order.
    pub fn recent_executions(&self, limit: usize) -> &[ExecutionRecord] {
        let end = self.executions.len().min(limit);
        &self.executions[..end]
    }
}

/// The node graph of an automation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    /// Nodes in stored order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<NodeRecord>,

    /// Anything else the platform stores alongside the nodes (edges, layout).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Definition {
    /// Find a node by id.
    pub fn find_node(&self, node_id: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.id == node_id)
    }
}

/// A single step of an automation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node identifier, referenced by log entries.
    #[serde(default)]
    pub id: String,

    /// Node type (e.g. `swap`, `checkBalance`, `variable`).
    #[serde(rename = "type", default)]
    pub node_type: String,

    /// Free-form node payload; `notes` and `config` live here.
    #[serde(default)]
    pub data: Value,
}

impl NodeRecord {
    /// Creates a node with an empty payload.
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            data: Value::Null,
        }
    }

    /// User notes attached to the node.
    pub fn notes(&self) -> Option<&str> {
        self.data
            .get("notes")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    /// Node configuration, or an empty object.
    pub fn config(&self) -> Value {
        self.data
            .get("config")
            .cloned()
            .filter(|c| !c.is_null())
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_upstream_document() {
        let raw = json!({
            "id": "cmkwhwr4j0001jp0412bdp8zw",
            "name": "DCA into ETH",
            "definition": {
                "nodes": [
                    {"id": "n1", "type": "checkBalance", "data": {"config": {"token": "USDC"}}},
                    {"id": "n2", "type": "swap", "data": {"notes": "buy the dip"}}
                ],
                "edges": [{"source": "n1", "target": "n2"}]
            },
            "executions": [],
            "createdAt": "2026-01-02T03:04:05Z"
        });

        let automation: AutomationRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(automation.display_name(), "DCA into ETH");
        assert_eq!(automation.nodes().len(), 2);
        assert_eq!(automation.find_node("n2").unwrap().notes(), Some("buy the dip"));
        assert_eq!(automation.find_node("n1").unwrap().config(), json!({"token": "USDC"}));
        assert_eq!(automation.extra["createdAt"], "2026-01-02T03:04:05Z");
        assert!(automation.definition.unwrap().extra.contains_key("edges"));
    }

    #[test]
    fn test_null_collections_default() {
        let automation: AutomationRecord =
            serde_json::from_value(json!({"id": "abc", "executions": null})).unwrap();
        assert!(automation.executions.is_empty());

        let automation: AutomationRecord = serde_json::from_value(json!({
            "id": "abc",
            "definition": {"nodes": null},
            "executions": [{"status": null, "logs": null}]
        }))
        .unwrap();
        assert!(automation.nodes().is_empty());
        assert_eq!(automation.executions.len(), 1);
        assert!(automation.executions[0].failing_log().is_none());
    }

    #[test]
    fn test_unmodelled_fields_round_trip() {
        let raw = json!({"id": "abc", "ownerId": "u1", "createdAt": "2026-01-02T03:04:05Z"});
        let automation: AutomationRecord = serde_json::from_value(raw).unwrap();
        let value = serde_json::to_value(&automation).unwrap();
        assert_eq!(value["ownerId"], "u1");
        assert_eq!(value["createdAt"], "2026-01-02T03:04:05Z");
        assert_eq!(value["executions"], json!([]));
    }

    #[test]
    fn test_missing_fields_default() {
        let automation: AutomationRecord = serde_json::from_value(json!({"id": "abc"})).unwrap();
        assert_eq!(automation.display_name(), "Unnamed");
        assert!(automation.nodes().is_empty());
        assert!(automation.latest_execution().is_none());
        assert!(automation.find_node("n1").is_none());
    }

    #[test]
    fn test_blank_name_is_unnamed() {
        let automation = AutomationRecord {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(automation.display_name(), "Unnamed");
    }

    #[test]
    fn test_node_config_defaults_to_empty_object() {
        let node = NodeRecord::new("n1", "swap");
        assert_eq!(node.config(), json!({}));
        assert!(node.notes().is_none());
    }

    #[test]
    fn test_recent_executions_caps_length() {
        let automation: AutomationRecord = serde_json::from_value(json!({
            "id": "abc",
            "executions": [
                {"status": "FAILED"}, {"status": "SUCCESS"}, {"status": "SUCCESS"}
            ]
        }))
        .unwrap();

        assert_eq!(automation.recent_executions(2).len(), 2);
        assert_eq!(automation.recent_executions(10).len(), 3);
    }
}
