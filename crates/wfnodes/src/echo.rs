use async_trait::async_trait;
use serde_json::Value;
use wfcore::{ExecutionContext, NodeExecutionError, NodeHandler};
use wfruntime::NodeFactory;

/// Returns its inputs unchanged. Handy as a terminal step and in test
/// harness workflows.
pub struct EchoNode;

#[async_trait]
impl NodeHandler for EchoNode {
    async fn handle(
        &self,
        _ctx: &mut ExecutionContext,
        inputs: &Value,
    ) -> Result<Value, NodeExecutionError> {
        Ok(inputs.clone())
    }
}

pub struct EchoFactory;

impl NodeFactory for EchoFactory {
    fn create(&self, _config: &Value) -> Result<Box<dyn NodeHandler>, wfcore::BuildError> {
        Ok(Box::new(EchoNode))
    }

    fn node_name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Return the bound inputs unchanged"
    }
}
