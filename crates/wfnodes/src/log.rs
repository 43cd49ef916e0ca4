use async_trait::async_trait;
use serde_json::Value;
use wfcore::{ExecutionContext, NodeExecutionError, NodeHandler};
use wfruntime::NodeFactory;

/// Logs its inputs through the context logger and passes the current
/// response data through untouched.
pub struct LogNode;

#[async_trait]
impl NodeHandler for LogNode {
    async fn handle(
        &self,
        ctx: &mut ExecutionContext,
        inputs: &Value,
    ) -> Result<Value, NodeExecutionError> {
        let message = inputs
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("(no message)");
        ctx.logger.log(message);

        Ok(ctx.response.data.clone())
    }
}

pub struct LogFactory;

impl NodeFactory for LogFactory {
    fn create(&self, _config: &Value) -> Result<Box<dyn NodeHandler>, wfcore::BuildError> {
        Ok(Box::new(LogNode))
    }

    fn node_name(&self) -> &str {
        "log"
    }

    fn description(&self) -> &str {
        "Log a message without changing the response"
    }
}
