use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use wfcore::{BuildError, NodeHandler};

/// Factory trait for creating node instances. Every registered node
/// type gets a constructor rather than a shared prototype, so each
/// resolution yields a freshly owned instance and per-instance state
/// can never leak across concurrent requests.
pub trait NodeFactory: Send + Sync {
    /// Create a new instance of the node, bound to the given static
    /// configuration (the step's `inputs` field, if any).
    fn create(&self, config: &Value) -> Result<Box<dyn NodeHandler>, BuildError>;

    /// Registered node name (e.g. "api-call", "mapper@1.0.0").
    fn node_name(&self) -> &str;

    /// Optional human-readable description, surfaced by the CLI.
    fn description(&self) -> &str {
        ""
    }
}

/// Registry of available node types. Populated at startup, read-only
/// afterwards; shared across all concurrent requests.
pub struct NodeRegistry {
    factories: HashMap<String, Arc<dyn NodeFactory>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, factory: Arc<dyn NodeFactory>) {
        let name = factory.node_name().to_string();
        tracing::info!("Registering node: {}", name);
        self.factories.insert(name, factory);
    }

    /// Create a fresh node instance for a registered name.
    pub fn create_node(
        &self,
        name: &str,
        config: &Value,
    ) -> Result<Box<dyn NodeHandler>, BuildError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| BuildError::NodeNotFound(name.to_string()))?;

        factory.create(config)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn node_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn description(&self, name: &str) -> Option<String> {
        self.factories.get(name).map(|f| f.description().to_string())
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
