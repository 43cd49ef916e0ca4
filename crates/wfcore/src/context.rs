use crate::error::NodeExecutionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Request-scoped mutable state threaded through node execution.
/// Created once per inbound request, mutated in place, discarded after
/// the response is sent. Never shared across requests.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub id: Uuid,
    pub request: RequestContext,
    pub response: ResponseContext,
    pub vars: HashMap<String, Value>,
    pub logger: ContextLogger,
    pub cancellation: tokio_util::sync::CancellationToken,
}

impl ExecutionContext {
    pub fn new() -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            request: RequestContext::default(),
            response: ResponseContext::default(),
            vars: HashMap::new(),
            logger: ContextLogger::new(id),
            cancellation: tokio_util::sync::CancellationToken::new(),
        }
    }

    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = request;
        self
    }

    /// Record a failure on the response. Clears nothing else; the
    /// execution loop decides whether remaining steps run.
    pub fn fail(&mut self, error: NodeExecutionError) {
        self.response.success = false;
        self.response.error = Some(error);
    }

    /// Clear the error state, used when a try/catch absorbs a failure.
    pub fn clear_error(&mut self) {
        self.response.success = true;
        self.response.error = None;
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Inbound request snapshot available to every node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub query: HashMap<String, String>,
    #[serde(default)]
    pub params: HashMap<String, String>,
    #[serde(default)]
    pub body: Value,
}

/// Response under construction. `data` is overwritten by each step
/// unless the step sets a variable instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseContext {
    pub data: Value,
    pub content_type: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<NodeExecutionError>,
}

impl Default for ResponseContext {
    fn default() -> Self {
        Self {
            data: Value::Null,
            content_type: "application/json".to_string(),
            success: true,
            error: None,
        }
    }
}

/// Thin logger that stamps every event with the execution id so that
/// interleaved concurrent requests stay attributable.
#[derive(Debug, Clone)]
pub struct ContextLogger {
    execution_id: Uuid,
}

impl ContextLogger {
    pub fn new(execution_id: Uuid) -> Self {
        Self { execution_id }
    }

    pub fn log(&self, message: impl AsRef<str>) {
        tracing::info!(execution_id = %self.execution_id, "{}", message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        tracing::error!(execution_id = %self.execution_id, "{}", message.as_ref());
    }
}
