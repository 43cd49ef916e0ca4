use async_trait::async_trait;
use serde_json::{json, Value};
use wfcore::{ExecutionContext, NodeExecutionError, NodeHandler};
use wfruntime::NodeFactory;

/// Outbound HTTP request node. Inputs: `url` (required), `method`
/// (default GET), `headers` (object of strings), `body` (JSON).
pub struct ApiCallNode {
    client: reqwest::Client,
}

impl ApiCallNode {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ApiCallNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandler for ApiCallNode {
    async fn handle(
        &self,
        ctx: &mut ExecutionContext,
        inputs: &Value,
    ) -> Result<Value, NodeExecutionError> {
        let url = inputs
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeExecutionError::new("api-call", "Missing required input: url"))?;
        let method = inputs
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_uppercase();

        ctx.logger.log(format!("{} {}", method, url));

        let mut request = match method.as_str() {
            "GET" => self.client.get(url),
            "POST" => self.client.post(url),
            "PUT" => self.client.put(url),
            "DELETE" => self.client.delete(url),
            other => {
                return Err(NodeExecutionError::new(
                    "api-call",
                    format!("Unsupported method: {}", other),
                ))
            }
        };

        if let Some(Value::Object(headers)) = inputs.get("headers") {
            for (key, value) in headers {
                if let Some(v) = value.as_str() {
                    request = request.header(key, v);
                }
            }
        }
        if let Some(body) = inputs.get("body") {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NodeExecutionError::new("api-call", format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body: Value = match response.text().await {
            Ok(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
            Err(e) => {
                return Err(NodeExecutionError::new(
                    "api-call",
                    format!("Failed to read response: {}", e),
                ))
            }
        };

        Ok(json!({ "status": status, "body": body }))
    }
}

pub struct ApiCallFactory;

impl NodeFactory for ApiCallFactory {
    fn create(&self, _config: &Value) -> Result<Box<dyn NodeHandler>, wfcore::BuildError> {
        Ok(Box::new(ApiCallNode::new()))
    }

    fn node_name(&self) -> &str {
        "api-call"
    }

    fn description(&self) -> &str {
        "Make an outbound HTTP request"
    }
}
