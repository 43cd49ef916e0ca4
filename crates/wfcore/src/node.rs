use crate::context::ExecutionContext;
use crate::error::NodeExecutionError;
use async_trait::async_trait;
use serde_json::Value;

/// Contract implemented by every executable node, whether it lives in
/// the in-process registry, was loaded from the filesystem or proxies a
/// remote runtime. The execution loop cannot tell the strategies apart.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// Run the node against the request-scoped context with the inputs
    /// bound by the workflow document.
    async fn handle(
        &self,
        ctx: &mut ExecutionContext,
        inputs: &Value,
    ) -> Result<Value, NodeExecutionError>;
}

/// A live node instance owned by the execution graph for one request's
/// lifetime. The annotations come from the step reference, never from
/// the implementation, and are stamped after resolution.
pub struct ResolvedNode {
    pub handler: Box<dyn NodeHandler>,
    pub node: String,
    pub name: String,
    pub active: bool,
    pub stop: bool,
    pub set_var: bool,
}

impl ResolvedNode {
    pub async fn handle(
        &self,
        ctx: &mut ExecutionContext,
        inputs: &Value,
    ) -> Result<Value, NodeExecutionError> {
        self.handler.handle(ctx, inputs).await
    }
}

impl std::fmt::Debug for ResolvedNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedNode")
            .field("node", &self.node)
            .field("name", &self.name)
            .field("active", &self.active)
            .field("stop", &self.stop)
            .field("set_var", &self.set_var)
            .finish()
    }
}
