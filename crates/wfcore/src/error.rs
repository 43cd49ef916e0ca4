use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Node execution error: {0}")]
    Execution(#[from] NodeExecutionError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Fatal errors raised while turning a workflow document into an
/// executable graph. None of these is ever retried; they all occur
/// before any node runs.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Workflow must have at least one step")]
    EmptyWorkflow,

    #[error("Workflow name must be provided")]
    MissingWorkflowName,

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Failed to load local node '{node}' from {path}: {message}")]
    LocalNode {
        node: String,
        path: String,
        message: String,
    },

    #[error("Invalid configuration for node '{node}': {message}")]
    InvalidNodeConfig { node: String, message: String },

    #[error("Invalid workflow document: {0}")]
    InvalidDocument(String),
}

/// Failure raised by node logic during execution. Carries the HTTP-ish
/// status code (default 500), the name of the failing node and an
/// optional stack for runtimes that provide one. This is what ends up in
/// `response.error` when a workflow fails.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[error("{message}")]
pub struct NodeExecutionError {
    pub code: u16,
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl NodeExecutionError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: 500,
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }
}

/// Network or timeout failure on a remote runtime invocation. Callers
/// never see this directly; it is surfaced as a `NodeExecutionError`
/// with no distinction from an in-process failure.
#[derive(Error, Debug)]
pub enum RemoteTransportError {
    #[error("Remote runtime unreachable: {0}")]
    Transport(String),

    #[error("Remote runtime timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Remote runtime returned a malformed response: {0}")]
    MalformedResponse(String),
}

impl RemoteTransportError {
    pub fn into_execution_error(self, node_name: &str) -> NodeExecutionError {
        NodeExecutionError::new(node_name, self.to_string())
    }
}

/// Malformed remote-invocation envelope. Client-class, raised before
/// graph building starts.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to decode message: {0}")]
    Malformed(String),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}
