//! Workflow resolution and execution runtime
//!
//! This crate turns a workflow document into an executable graph (node
//! registry + typed resolver + graph builder) and walks that graph with
//! a sequential, request-scoped execution loop.

mod builder;
mod config;
mod executor;
mod registry;
mod remote;
mod resolver;
mod runtime;

pub use builder::{EntryShape, ExecutionGraph, GraphBuilder, ResolvedCondition, ResolvedEntry};
pub use config::{RemoteRuntimeConfig, RuntimeConfig};
pub use executor::{ConditionEvaluator, DefaultConditionEvaluator, RunOutcome, WorkflowExecutor};
pub use registry::{NodeFactory, NodeRegistry};
pub use remote::RemoteRuntimeNode;
pub use resolver::{LocalNodeDefinition, NodeTypeResolver};
pub use runtime::WorkflowRuntime;
