use crate::error::{BuildError, EngineError};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Complete workflow definition as authored in JSON, YAML or TOML. The
/// three encodings are structurally identical. Immutable once loaded;
/// shared read-only across concurrent requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDocument {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub trigger: TriggerSpec,
    #[serde(default)]
    pub steps: Vec<StepRef>,
    /// Raw node-map entries. Shapes are classified once, at build time,
    /// by the graph builder; nothing downstream re-inspects this.
    #[serde(default)]
    pub nodes: HashMap<String, serde_json::Value>,
}

impl WorkflowDocument {
    pub fn from_json(input: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_yaml(input: &str) -> crate::Result<Self> {
        serde_yaml::from_str(input)
            .map_err(|e| EngineError::Build(BuildError::InvalidDocument(e.to_string())))
    }

    pub fn from_toml(input: &str) -> crate::Result<Self> {
        toml::from_str(input)
            .map_err(|e| EngineError::Build(BuildError::InvalidDocument(e.to_string())))
    }

    /// Parse a document file, picking the encoding from the extension.
    pub fn from_path(path: &Path) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&raw),
            Some("toml") => Self::from_toml(&raw),
            _ => Self::from_json(&raw),
        }
    }
}

/// Trigger section of a workflow document. Only the HTTP trigger is
/// modelled; the engine itself never reads it beyond the route path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpTrigger>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpTrigger {
    #[serde(default = "default_method")]
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,
}

fn default_method() -> String {
    "*".to_string()
}

/// One reference to a node within execution order, carrying per-use
/// flags. `active`, `stop` and `set_var` default to the values the
/// execution loop expects when the document omits them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRef {
    pub name: String,
    pub node: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub stop: bool,
    #[serde(default)]
    pub set_var: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

/// One branch of a conditional entry: a predicate plus the steps to run
/// when it matches. A missing predicate is the else-branch and always
/// matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    pub steps: Vec<StepRef>,
}

/// Closed set of node resolution strategies. Adding a strategy is a
/// compile-time-checked change: the resolver matches exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// In-process prototype registry lookup; a fresh instance per
    /// resolution.
    Module,
    /// Node definition loaded from the filesystem under `nodes_path`.
    Local,
    /// Proxy to the external python3 runtime over the wire protocol.
    RuntimePython3,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Module => "module",
            NodeKind::Local => "local",
            NodeKind::RuntimePython3 => "runtime.python3",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "module" => Ok(NodeKind::Module),
            "local" => Ok(NodeKind::Local),
            "runtime.python3" => Ok(NodeKind::RuntimePython3),
            other => Err(BuildError::UnknownNodeType(other.to_string())),
        }
    }
}

impl Serialize for NodeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_step_defaults() {
        let doc: WorkflowDocument = serde_json::from_str(
            r#"{
                "name": "countries",
                "version": "1.0.0",
                "trigger": { "http": { "method": "GET", "path": "/countries/:id" } },
                "steps": [
                    { "name": "fetch", "node": "api-call", "type": "module" }
                ],
                "nodes": {
                    "fetch": { "inputs": { "url": "https://example.test" } }
                }
            }"#,
        )
        .unwrap();

        let step = &doc.steps[0];
        assert_eq!(step.kind, NodeKind::Module);
        assert!(step.active);
        assert!(!step.stop);
        assert!(!step.set_var);
    }

    #[test]
    fn rejects_unknown_node_type() {
        let err = serde_json::from_str::<StepRef>(
            r#"{ "name": "x", "node": "y", "type": "unknown-type" }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown-type"));

        match NodeKind::from_str("unknown-type") {
            Err(BuildError::UnknownNodeType(t)) => assert_eq!(t, "unknown-type"),
            other => panic!("expected UnknownNodeType, got {:?}", other),
        }
    }

    #[test]
    fn yaml_and_json_are_structurally_identical() {
        let json = WorkflowDocument::from_json(
            r#"{"name":"wf","version":"1.0.0","steps":[{"name":"a","node":"echo","type":"module"}]}"#,
        )
        .unwrap();
        let yaml = WorkflowDocument::from_yaml(
            "name: wf\nversion: 1.0.0\nsteps:\n  - name: a\n    node: echo\n    type: module\n",
        )
        .unwrap();
        assert_eq!(json.name, yaml.name);
        assert_eq!(json.steps[0].node, yaml.steps[0].node);
        assert_eq!(json.steps[0].kind, yaml.steps[0].kind);
    }
}
