use crate::config::RemoteRuntimeConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use wfcore::{
    envelope::RemoteEnvelope, ExecutionContext, NodeExecutionError, NodeHandler,
    RemoteInvocation, RemoteTransportError, WorkflowDocument,
};

/// Proxy node for the `runtime.python3` strategy. Implements the same
/// contract as any in-process node; the execution loop cannot tell the
/// difference. Each invocation is one blocking round trip to the
/// configured runtime endpoint, governed by the configured timeout.
pub struct RemoteRuntimeNode {
    node: String,
    config: RemoteRuntimeConfig,
    client: reqwest::Client,
}

impl RemoteRuntimeNode {
    pub fn new(node: String, config: RemoteRuntimeConfig, client: reqwest::Client) -> Self {
        Self {
            node,
            config,
            client,
        }
    }

    /// A one-off single-step workflow carrying this node and its
    /// inputs, executed remotely exactly like a document-driven one.
    fn synthesize_workflow(&self, inputs: &Value) -> WorkflowDocument {
        serde_json::from_value(json!({
            "name": self.node,
            "version": "1.0.0",
            "steps": [
                { "name": self.node, "node": self.node, "type": "module" }
            ],
            "nodes": {
                &self.node: { "inputs": inputs }
            }
        }))
        .expect("synthesized workflow is well-formed")
    }

    async fn invoke(
        &self,
        ctx: &ExecutionContext,
        inputs: &Value,
    ) -> Result<Value, RemoteTransportError> {
        let invocation = RemoteInvocation {
            request: serde_json::to_value(&ctx.request)
                .map_err(|e| RemoteTransportError::MalformedResponse(e.to_string()))?,
            workflow: self.synthesize_workflow(inputs),
        };

        let envelope = RemoteEnvelope::encode(&self.node, &invocation)
            .map_err(|e| RemoteTransportError::MalformedResponse(e.to_string()))?;

        let response = self
            .client
            .post(self.config.endpoint())
            .timeout(self.config.timeout)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteTransportError::Timeout {
                        seconds: self.config.timeout.as_secs(),
                    }
                } else {
                    RemoteTransportError::Transport(e.to_string())
                }
            })?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| RemoteTransportError::MalformedResponse(e.to_string()))?;

        if body.get("success").and_then(Value::as_bool).unwrap_or(false) {
            Ok(body.get("data").cloned().unwrap_or(Value::Null))
        } else {
            let message = body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("remote node execution failed")
                .to_string();
            Err(RemoteTransportError::Transport(message))
        }
    }
}

#[async_trait]
impl NodeHandler for RemoteRuntimeNode {
    async fn handle(
        &self,
        ctx: &mut ExecutionContext,
        inputs: &Value,
    ) -> Result<Value, NodeExecutionError> {
        ctx.logger
            .log(format!("Invoking remote node '{}' at {}", self.node, self.config.endpoint()));

        // Transport failures surface exactly like node failures; the
        // caller sees no distinction.
        self.invoke(ctx, inputs)
            .await
            .map_err(|e| e.into_execution_error(&self.node))
    }
}
