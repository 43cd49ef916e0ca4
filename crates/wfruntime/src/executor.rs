use crate::builder::{EntryShape, ExecutionGraph, ResolvedEntry};
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use wfcore::{ExecutionContext, NodeExecutionError, ResolvedNode};

/// Terminal state of one workflow run. The response carries the
/// details; this only reports how the state machine ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every active step ran to the end.
    Completed,
    /// A step with `stop=true` short-circuited the run (terminal
    /// success).
    Stopped,
    /// A step failed; remaining top-level steps never ran.
    Failed,
}

/// Predicate evaluation is an external capability; the loop only needs
/// a yes/no per branch.
pub trait ConditionEvaluator: Send + Sync {
    fn evaluate(&self, expr: &str, ctx: &ExecutionContext) -> Result<bool, NodeExecutionError>;
}

/// Minimal built-in evaluator for tests and the CLI harness. Supports
/// `true`/`false` literals, dot-path truthiness and `==`/`!=` against a
/// quoted string or number. Paths are rooted at `vars`, `request` and
/// `data` (the current response data).
pub struct DefaultConditionEvaluator;

impl ConditionEvaluator for DefaultConditionEvaluator {
    fn evaluate(&self, expr: &str, ctx: &ExecutionContext) -> Result<bool, NodeExecutionError> {
        let expr = expr.trim();
        match expr {
            "" | "true" => return Ok(true),
            "false" => return Ok(false),
            _ => {}
        }

        if let Some((lhs, rhs)) = expr.split_once("==") {
            return Ok(operands_equal(
                &resolve_operand(lhs.trim(), ctx),
                &resolve_operand(rhs.trim(), ctx),
            ));
        }
        if let Some((lhs, rhs)) = expr.split_once("!=") {
            return Ok(!operands_equal(
                &resolve_operand(lhs.trim(), ctx),
                &resolve_operand(rhs.trim(), ctx),
            ));
        }

        Ok(truthy(&resolve_operand(expr, ctx)))
    }
}

/// Numbers compare by value: the integer `5` in a context equals the
/// literal `5`, which parses as a float.
fn operands_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn resolve_operand(raw: &str, ctx: &ExecutionContext) -> Value {
    if let Some(literal) = raw
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
    {
        return Value::String(literal.to_string());
    }
    if let Ok(n) = raw.parse::<f64>() {
        return serde_json::json!(n);
    }

    let mut segments = raw.split('.');
    let root = match segments.next() {
        Some("vars") => serde_json::to_value(&ctx.vars).unwrap_or(Value::Null),
        Some("request") => serde_json::to_value(&ctx.request).unwrap_or(Value::Null),
        Some("data") => ctx.response.data.clone(),
        _ => return Value::Null,
    };

    segments.fold(root, |acc, key| {
        acc.get(key).cloned().unwrap_or(Value::Null)
    })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

enum StepOutcome {
    Continuing,
    Stopped,
    Failed(NodeExecutionError),
}

/// The state machine that walks a built graph, applying per-step flags
/// and error/branch semantics. Strictly sequential within one request:
/// step `i+1` never begins before step `i` resolves.
pub struct WorkflowExecutor {
    evaluator: Arc<dyn ConditionEvaluator>,
}

impl WorkflowExecutor {
    pub fn new() -> Self {
        Self::with_evaluator(Arc::new(DefaultConditionEvaluator))
    }

    pub fn with_evaluator(evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Walk the graph's top-level steps to a terminal state. Failure
    /// details land on `ctx.response`; the outcome only reports how the
    /// run ended.
    pub async fn run(&self, graph: &ExecutionGraph, ctx: &mut ExecutionContext) -> RunOutcome {
        let start = Instant::now();
        let outcome = match self.run_steps(&graph.steps, graph, ctx).await {
            StepOutcome::Continuing => RunOutcome::Completed,
            StepOutcome::Stopped => RunOutcome::Stopped,
            StepOutcome::Failed(_) => RunOutcome::Failed,
        };
        ctx.logger.log(format!(
            "Workflow finished ({:?}) in {}ms",
            outcome,
            start.elapsed().as_millis()
        ));
        outcome
    }

    fn run_steps<'a>(
        &'a self,
        steps: &'a [ResolvedNode],
        graph: &'a ExecutionGraph,
        ctx: &'a mut ExecutionContext,
    ) -> BoxFuture<'a, StepOutcome> {
        Box::pin(async move {
            for step in steps {
                // Cooperative only: an abandoned client never pre-empts
                // an in-flight node.
                if ctx.cancellation.is_cancelled() {
                    let err = NodeExecutionError::new(&step.name, "execution cancelled");
                    ctx.fail(err.clone());
                    return StepOutcome::Failed(err);
                }

                if !step.active {
                    ctx.logger.log(format!("Skipping inactive step '{}'", step.name));
                    continue;
                }

                let entry = graph.nodes.get(&step.name);
                let outcome = match entry.map(|e| &e.shape) {
                    None | Some(EntryShape::Plain { .. }) => {
                        self.run_plain(step, entry, ctx).await
                    }
                    Some(EntryShape::Flow { steps, meta }) => {
                        if let Some(content_type) =
                            meta.get("contentType").and_then(Value::as_str)
                        {
                            ctx.response.content_type = content_type.to_string();
                        }
                        self.run_steps(steps, graph, ctx).await
                    }
                    Some(EntryShape::Conditional { conditions }) => {
                        self.run_conditional(step, conditions, graph, ctx).await
                    }
                    Some(EntryShape::TryCatch {
                        try_steps,
                        catch_steps,
                    }) => self.run_try_catch(try_steps, catch_steps, graph, ctx).await,
                };

                match outcome {
                    StepOutcome::Continuing if step.stop => return StepOutcome::Stopped,
                    StepOutcome::Continuing => {}
                    terminal => return terminal,
                }
            }

            StepOutcome::Continuing
        })
    }

    async fn run_plain(
        &self,
        step: &ResolvedNode,
        entry: Option<&ResolvedEntry>,
        ctx: &mut ExecutionContext,
    ) -> StepOutcome {
        let inputs = entry
            .and_then(|e| match &e.shape {
                EntryShape::Plain { fields } => fields.get("inputs").cloned(),
                _ => None,
            })
            .unwrap_or(Value::Null);

        ctx.logger.log(format!("Running step '{}' [{}]", step.name, step.node));

        let result = step.handle(ctx, &inputs).await;
        let output = match result {
            Ok(output) => output,
            Err(err) => return self.fail_step(step, err, ctx),
        };

        // Output reshaping only; never a state transition.
        let output = match entry.and_then(|e| e.mapper.as_ref()) {
            Some(mapper) => match mapper.handle(ctx, &output).await {
                Ok(mapped) => mapped,
                Err(err) => return self.fail_step(step, err, ctx),
            },
            None => output,
        };

        if step.set_var {
            ctx.vars.insert(step.name.clone(), output);
        } else {
            ctx.response.data = output;
        }

        StepOutcome::Continuing
    }

    async fn run_conditional(
        &self,
        step: &ResolvedNode,
        conditions: &[crate::builder::ResolvedCondition],
        graph: &ExecutionGraph,
        ctx: &mut ExecutionContext,
    ) -> StepOutcome {
        for condition in conditions {
            let matched = match &condition.when {
                Some(expr) => match self.evaluator.evaluate(expr, ctx) {
                    Ok(matched) => matched,
                    Err(err) => return self.fail_step(step, err, ctx),
                },
                // A branch without a predicate is the else-branch.
                None => true,
            };

            if matched {
                return self.run_steps(&condition.steps, graph, ctx).await;
            }
        }

        // No match is a no-op, not a failure.
        StepOutcome::Continuing
    }

    async fn run_try_catch(
        &self,
        try_steps: &[ResolvedNode],
        catch_steps: &[ResolvedNode],
        graph: &ExecutionGraph,
        ctx: &mut ExecutionContext,
    ) -> StepOutcome {
        match self.run_steps(try_steps, graph, ctx).await {
            StepOutcome::Failed(err) => {
                ctx.logger
                    .log(format!("Caught failure in '{}': {}", err.name, err.message));
                ctx.clear_error();
                // The absorbed error stays visible to the catch flow.
                ctx.vars.insert(
                    "error".to_string(),
                    serde_json::to_value(&err).unwrap_or(Value::Null),
                );
                self.run_steps(catch_steps, graph, ctx).await
            }
            other => other,
        }
    }

    fn fail_step(
        &self,
        step: &ResolvedNode,
        mut err: NodeExecutionError,
        ctx: &mut ExecutionContext,
    ) -> StepOutcome {
        err.name = step.name.clone();
        ctx.logger
            .error(format!("Step '{}' failed: {}", step.name, err.message));
        ctx.fail(err.clone());
        StepOutcome::Failed(err)
    }
}

impl Default for WorkflowExecutor {
    fn default() -> Self {
        Self::new()
    }
}
