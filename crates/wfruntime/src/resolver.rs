use crate::config::RuntimeConfig;
use crate::registry::NodeRegistry;
use crate::remote::RemoteRuntimeNode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use wfcore::{BuildError, NodeKind, ResolvedNode, StepRef};

/// Maps a step's declared type to a resolution strategy and returns one
/// ready-to-run node instance. The strategy set is closed; the match is
/// exhaustive, so adding a strategy is a compile-time-checked change.
pub struct NodeTypeResolver {
    registry: Arc<NodeRegistry>,
    config: RuntimeConfig,
    http: reqwest::Client,
}

/// On-disk definition for a `local` node: a JSON manifest naming a
/// registered node type plus the configuration to bind into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalNodeDefinition {
    pub node_type: String,
    #[serde(default)]
    pub config: Value,
}

impl NodeTypeResolver {
    pub fn new(registry: Arc<NodeRegistry>, config: RuntimeConfig) -> Self {
        Self {
            registry,
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Resolve a step reference to a live node instance. Any failure
    /// here is a fatal build error; nothing is deferred to execution.
    pub fn resolve(&self, step: &StepRef) -> Result<ResolvedNode, BuildError> {
        let handler = match step.kind {
            NodeKind::Module => self.resolve_module(step)?,
            NodeKind::Local => self.resolve_local(step)?,
            NodeKind::RuntimePython3 => self.resolve_runtime(step),
        };

        // The step's declared flags and defaults always win over
        // whatever the implementation carries.
        Ok(ResolvedNode {
            handler,
            node: step.node.clone(),
            name: step.name.clone(),
            active: step.active,
            stop: step.stop,
            set_var: step.set_var,
        })
    }

    /// `module`: look the name up in the in-memory registry. The
    /// factory creates a fresh, independently-owned instance per
    /// resolution, never a shared one.
    fn resolve_module(
        &self,
        step: &StepRef,
    ) -> Result<Box<dyn wfcore::NodeHandler>, BuildError> {
        let config = step.inputs.clone().unwrap_or(Value::Null);
        self.registry.create_node(&step.node, &config)
    }

    /// `local`: load a node manifest at `{nodes_path}/{node}.json` and
    /// instantiate the type it names through the registry.
    fn resolve_local(&self, step: &StepRef) -> Result<Box<dyn wfcore::NodeHandler>, BuildError> {
        let root = self.config.nodes_path.as_ref().ok_or_else(|| BuildError::LocalNode {
            node: step.node.clone(),
            path: "<unset>".to_string(),
            message: "NODES_PATH is not configured".to_string(),
        })?;

        let path = root.join(format!("{}.json", step.node));
        let raw = std::fs::read_to_string(&path).map_err(|e| BuildError::LocalNode {
            node: step.node.clone(),
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let definition: LocalNodeDefinition =
            serde_json::from_str(&raw).map_err(|e| BuildError::LocalNode {
                node: step.node.clone(),
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        self.registry
            .create_node(&definition.node_type, &definition.config)
            .map_err(|e| BuildError::LocalNode {
                node: step.node.clone(),
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }

    /// `runtime.python3`: a proxy implementing the identical node
    /// contract; invocation is a network round trip to the configured
    /// endpoint.
    fn resolve_runtime(&self, step: &StepRef) -> Box<dyn wfcore::NodeHandler> {
        Box::new(RemoteRuntimeNode::new(
            step.node.clone(),
            self.config.remote.clone(),
            self.http.clone(),
        ))
    }
}
