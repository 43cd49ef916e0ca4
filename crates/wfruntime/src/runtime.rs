use crate::builder::GraphBuilder;
use crate::config::RuntimeConfig;
use crate::executor::{ConditionEvaluator, RunOutcome, WorkflowExecutor};
use crate::registry::NodeRegistry;
use crate::resolver::NodeTypeResolver;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use wfcore::{
    BuildError, EngineError, ExecutionContext, RemoteInvocation, RequestContext,
    WorkflowDocument,
};

/// Main entry point: resolves a workflow name to a fresh execution
/// graph and walks it. Every transport (HTTP trigger, CLI, SDK) is a
/// thin façade over this. The document store and the node registry are
/// the only state shared across concurrent requests, and both are
/// read-only after startup.
pub struct WorkflowRuntime {
    registry: Arc<NodeRegistry>,
    resolver: NodeTypeResolver,
    executor: WorkflowExecutor,
    documents: RwLock<HashMap<String, Arc<WorkflowDocument>>>,
}

impl WorkflowRuntime {
    pub fn new(registry: Arc<NodeRegistry>, config: RuntimeConfig) -> Self {
        Self {
            resolver: NodeTypeResolver::new(registry.clone(), config),
            registry,
            executor: WorkflowExecutor::new(),
            documents: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_evaluator(
        registry: Arc<NodeRegistry>,
        config: RuntimeConfig,
        evaluator: Arc<dyn ConditionEvaluator>,
    ) -> Self {
        Self {
            resolver: NodeTypeResolver::new(registry.clone(), config),
            registry,
            executor: WorkflowExecutor::with_evaluator(evaluator),
            documents: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Register a workflow document under its name. Intended for
    /// startup; documents are read-only afterwards.
    pub async fn register_document(&self, document: WorkflowDocument) {
        let mut documents = self.documents.write().await;
        documents.insert(document.name.clone(), Arc::new(document));
    }

    pub async fn document(&self, name: &str) -> Option<Arc<WorkflowDocument>> {
        self.documents.read().await.get(name).cloned()
    }

    /// Resolve a workflow name and execute it against the given
    /// context. Builds a fresh graph per call; no compiled plan is
    /// cached.
    pub async fn execute(
        &self,
        name: &str,
        ctx: &mut ExecutionContext,
    ) -> Result<RunOutcome, EngineError> {
        if name.is_empty() {
            return Err(BuildError::MissingWorkflowName.into());
        }

        let document = self
            .document(name)
            .await
            .ok_or_else(|| BuildError::WorkflowNotFound(name.to_string()))?;

        self.execute_document(&document, ctx).await
    }

    /// Execute a document directly, without registration.
    pub async fn execute_document(
        &self,
        document: &WorkflowDocument,
        ctx: &mut ExecutionContext,
    ) -> Result<RunOutcome, EngineError> {
        ctx.logger.log(format!(
            "Executing workflow '{}' version {}",
            document.name, document.version
        ));

        let graph = GraphBuilder::new(&self.resolver).build(document)?;
        Ok(self.executor.run(&graph, ctx).await)
    }

    /// Execute a decoded remote invocation: its request snapshot seeds
    /// a fresh context and its one-off workflow runs exactly like a
    /// document-driven one.
    pub async fn execute_remote(
        &self,
        invocation: RemoteInvocation,
    ) -> Result<(ExecutionContext, RunOutcome), EngineError> {
        let request: RequestContext = serde_json::from_value(invocation.request)?;
        let mut ctx = ExecutionContext::new().with_request(request);
        let outcome = self.execute_document(&invocation.workflow, &mut ctx).await?;
        Ok((ctx, outcome))
    }

    /// Validate a document by building its graph once. Surfaces every
    /// build-time error without executing a single node.
    pub fn validate(&self, document: &WorkflowDocument) -> Result<(), EngineError> {
        GraphBuilder::new(&self.resolver).build(document)?;
        Ok(())
    }
}
