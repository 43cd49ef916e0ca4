//! Core abstractions for the workflow engine
//!
//! This crate provides the fundamental types that every other component
//! depends on: the workflow document model, the request-scoped execution
//! context, the node contract, the error taxonomy, the route matcher and
//! the remote-invocation wire codec. It does not depend on the runtime
//! or node crates.

mod context;
mod document;
mod error;
pub mod envelope;
mod node;
pub mod route;

pub use context::{ContextLogger, ExecutionContext, RequestContext, ResponseContext};
pub use document::{
    ConditionSpec, HttpTrigger, NodeKind, StepRef, TriggerSpec, WorkflowDocument,
};
pub use envelope::{RemoteEnvelope, RemoteInvocation};
pub use error::{BuildError, DecodeError, EngineError, NodeExecutionError, RemoteTransportError};
pub use node::{NodeHandler, ResolvedNode};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
