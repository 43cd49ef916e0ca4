use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use wfcore::{
    BuildError, ExecutionContext, NodeExecutionError, NodeHandler, WorkflowDocument,
};
use wfruntime::{NodeFactory, NodeRegistry, RunOutcome, RuntimeConfig, WorkflowRuntime};

/// Emits the `value` from its inputs and records that it ran (under its
/// `label`, if any), so tests can assert which steps executed. A `fail`
/// input turns the invocation into a failure with that message.
struct RecordingNode {
    ran: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl NodeHandler for RecordingNode {
    async fn handle(
        &self,
        _ctx: &mut ExecutionContext,
        inputs: &Value,
    ) -> Result<Value, NodeExecutionError> {
        let label = inputs
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or("emit");
        self.ran.lock().unwrap().push(label.to_string());

        if let Some(message) = inputs.get("fail").and_then(Value::as_str) {
            return Err(NodeExecutionError::new(label, message));
        }

        match inputs.get("value") {
            Some(value) => Ok(value.clone()),
            None => Ok(inputs.clone()),
        }
    }
}

struct RecordingFactory {
    ran: Arc<Mutex<Vec<String>>>,
}

impl NodeFactory for RecordingFactory {
    fn create(&self, _config: &Value) -> Result<Box<dyn NodeHandler>, BuildError> {
        Ok(Box::new(RecordingNode {
            ran: self.ran.clone(),
        }))
    }

    fn node_name(&self) -> &str {
        "emit"
    }
}

/// Registered under the reserved mapper namespace; wraps its input in
/// `{ "mapped": ... }`.
struct WrapMapperFactory;

struct WrapMapperNode;

#[async_trait]
impl NodeHandler for WrapMapperNode {
    async fn handle(
        &self,
        _ctx: &mut ExecutionContext,
        inputs: &Value,
    ) -> Result<Value, NodeExecutionError> {
        Ok(json!({ "mapped": inputs }))
    }
}

impl NodeFactory for WrapMapperFactory {
    fn create(&self, _config: &Value) -> Result<Box<dyn NodeHandler>, BuildError> {
        Ok(Box::new(WrapMapperNode))
    }

    fn node_name(&self) -> &str {
        "mapper@1.0.0"
    }
}

fn runtime() -> (WorkflowRuntime, Arc<Mutex<Vec<String>>>) {
    let ran = Arc::new(Mutex::new(Vec::new()));
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(RecordingFactory { ran: ran.clone() }));
    registry.register(Arc::new(WrapMapperFactory));

    (
        WorkflowRuntime::new(Arc::new(registry), RuntimeConfig::default()),
        ran,
    )
}

fn document(value: Value) -> WorkflowDocument {
    serde_json::from_value(value).expect("test document is well-formed")
}

fn emit_step(name: &str) -> Value {
    json!({ "name": name, "node": "emit", "type": "module" })
}

#[tokio::test]
async fn stop_flag_short_circuits_remaining_steps() {
    let (runtime, ran) = runtime();

    let doc = document(json!({
        "name": "stopper",
        "version": "1.0.0",
        "steps": [
            emit_step("one"),
            { "name": "two", "node": "emit", "type": "module", "stop": true },
            emit_step("three")
        ],
        "nodes": {
            "one": { "inputs": { "value": "first" } },
            "two": { "inputs": { "value": "second", "label": "two" } },
            "three": { "inputs": { "value": "third", "label": "three" } }
        }
    }));

    let mut ctx = ExecutionContext::new();
    let outcome = runtime.execute_document(&doc, &mut ctx).await.unwrap();

    assert_eq!(outcome, RunOutcome::Stopped);
    assert!(ctx.response.success);
    assert_eq!(ctx.response.data, json!("second"));
    assert!(!ran.lock().unwrap().contains(&"three".to_string()));
}

#[tokio::test]
async fn first_step_failure_aborts_the_run() {
    let (runtime, ran) = runtime();

    let doc = document(json!({
        "name": "failing",
        "version": "1.0.0",
        "steps": [emit_step("boom"), emit_step("after")],
        "nodes": {
            "boom": { "inputs": { "fail": "database unreachable" } },
            "after": { "inputs": { "value": "never", "label": "after" } }
        }
    }));

    let mut ctx = ExecutionContext::new();
    let outcome = runtime.execute_document(&doc, &mut ctx).await.unwrap();

    assert_eq!(outcome, RunOutcome::Failed);
    assert!(!ctx.response.success);
    let error = ctx.response.error.as_ref().unwrap();
    assert_eq!(error.message, "database unreachable");
    assert_eq!(error.name, "boom");
    assert_eq!(error.code, 500);
    assert!(!ran.lock().unwrap().contains(&"after".to_string()));
}

#[tokio::test]
async fn set_var_writes_vars_instead_of_response() {
    let (runtime, _) = runtime();

    let doc = document(json!({
        "name": "vars",
        "version": "1.0.0",
        "steps": [
            { "name": "stash", "node": "emit", "type": "module", "set_var": true },
            emit_step("respond")
        ],
        "nodes": {
            "stash": { "inputs": { "value": { "token": "abc" } } },
            "respond": { "inputs": { "value": "done" } }
        }
    }));

    let mut ctx = ExecutionContext::new();
    runtime.execute_document(&doc, &mut ctx).await.unwrap();

    assert_eq!(ctx.vars["stash"], json!({ "token": "abc" }));
    assert_eq!(ctx.response.data, json!("done"));
}

#[tokio::test]
async fn inactive_steps_are_skipped_untouched() {
    let (runtime, ran) = runtime();

    let doc = document(json!({
        "name": "inactive",
        "version": "1.0.0",
        "steps": [
            { "name": "off", "node": "emit", "type": "module", "active": false },
            emit_step("on")
        ],
        "nodes": {
            "off": { "inputs": { "value": "ignored", "label": "off" } },
            "on": { "inputs": { "value": "ran", "label": "on" } }
        }
    }));

    let mut ctx = ExecutionContext::new();
    let outcome = runtime.execute_document(&doc, &mut ctx).await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(ctx.response.data, json!("ran"));
    assert!(!ran.lock().unwrap().contains(&"off".to_string()));
}

#[tokio::test]
async fn conditional_runs_first_matching_branch() {
    let (runtime, ran) = runtime();

    let doc = document(json!({
        "name": "branching",
        "version": "1.0.0",
        "steps": [
            { "name": "stash", "node": "emit", "type": "module", "set_var": true },
            emit_step("branch")
        ],
        "nodes": {
            "stash": { "inputs": { "value": "premium" } },
            "branch": {
                "conditions": [
                    { "when": "vars.stash == 'basic'", "steps": [emit_step("basic-path")] },
                    { "when": "vars.stash == 'premium'", "steps": [emit_step("premium-path")] },
                    { "steps": [emit_step("fallback")] }
                ]
            },
            "premium-path": { "inputs": { "value": "upgraded", "label": "premium-path" } },
            "basic-path": { "inputs": { "label": "basic-path" } },
            "fallback": { "inputs": { "label": "fallback" } }
        }
    }));

    let mut ctx = ExecutionContext::new();
    runtime.execute_document(&doc, &mut ctx).await.unwrap();

    let ran = ran.lock().unwrap();
    assert!(ran.contains(&"premium-path".to_string()));
    assert!(!ran.contains(&"basic-path".to_string()));
    assert!(!ran.contains(&"fallback".to_string()));
    assert_eq!(ctx.response.data, json!("upgraded"));
}

#[tokio::test]
async fn conditional_compares_integer_vars_against_numeric_literals() {
    let (runtime, ran) = runtime();

    let doc = document(json!({
        "name": "numeric",
        "version": "1.0.0",
        "steps": [
            { "name": "count", "node": "emit", "type": "module", "set_var": true },
            emit_step("branch")
        ],
        "nodes": {
            "count": { "inputs": { "value": 5 } },
            "branch": {
                "conditions": [
                    { "when": "vars.count == 5", "steps": [emit_step("matched")] },
                    { "when": "vars.count != 5", "steps": [emit_step("mismatched")] }
                ]
            },
            "matched": { "inputs": { "value": "five", "label": "matched" } },
            "mismatched": { "inputs": { "label": "mismatched" } }
        }
    }));

    let mut ctx = ExecutionContext::new();
    runtime.execute_document(&doc, &mut ctx).await.unwrap();

    let ran = ran.lock().unwrap();
    assert!(ran.contains(&"matched".to_string()));
    assert!(!ran.contains(&"mismatched".to_string()));
    assert_eq!(ctx.response.data, json!("five"));
}

#[tokio::test]
async fn conditional_without_match_is_a_noop() {
    let (runtime, _) = runtime();

    let doc = document(json!({
        "name": "no-match",
        "version": "1.0.0",
        "steps": [emit_step("before"), emit_step("branch")],
        "nodes": {
            "before": { "inputs": { "value": "kept" } },
            "branch": {
                "conditions": [
                    { "when": "vars.absent == 'x'", "steps": [emit_step("never")] }
                ]
            }
        }
    }));

    let mut ctx = ExecutionContext::new();
    let outcome = runtime.execute_document(&doc, &mut ctx).await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(ctx.response.data, json!("kept"));
}

#[tokio::test]
async fn try_catch_absorbs_failures_and_runs_catch() {
    let (runtime, ran) = runtime();

    let doc = document(json!({
        "name": "guarded",
        "version": "1.0.0",
        "steps": [emit_step("guarded")],
        "nodes": {
            "guarded": {
                "try": { "steps": [emit_step("risky")] },
                "catch": { "steps": [emit_step("recover")] }
            },
            "risky": { "inputs": { "fail": "upstream exploded", "label": "risky" } },
            "recover": { "inputs": { "value": "recovered", "label": "recover" } }
        }
    }));

    let mut ctx = ExecutionContext::new();
    let outcome = runtime.execute_document(&doc, &mut ctx).await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert!(ctx.response.success);
    assert!(ctx.response.error.is_none());
    assert_eq!(ctx.response.data, json!("recovered"));
    assert!(ran.lock().unwrap().contains(&"recover".to_string()));

    // The absorbed error stays visible to the catch flow.
    let caught = &ctx.vars["error"];
    assert_eq!(caught["message"], json!("upstream exploded"));
}

#[tokio::test]
async fn mapper_reshapes_output_before_context_write() {
    let (runtime, _) = runtime();

    let doc = document(json!({
        "name": "mapped",
        "version": "1.0.0",
        "steps": [emit_step("fetch")],
        "nodes": {
            "fetch": {
                "inputs": { "value": { "id": 7 } },
                "mapper": { "name": "reshape", "node": "mapper@1.0.0", "type": "module" }
            }
        }
    }));

    let mut ctx = ExecutionContext::new();
    runtime.execute_document(&doc, &mut ctx).await.unwrap();

    assert_eq!(ctx.response.data, json!({ "mapped": { "id": 7 } }));
}

#[tokio::test]
async fn nested_flow_metadata_sets_content_type() {
    let (runtime, _) = runtime();

    let doc = document(json!({
        "name": "page",
        "version": "1.0.0",
        "steps": [emit_step("render")],
        "nodes": {
            "render": {
                "steps": [emit_step("inner")],
                "contentType": "text/html"
            },
            "inner": { "inputs": { "value": "<h1>hi</h1>" } }
        }
    }));

    let mut ctx = ExecutionContext::new();
    runtime.execute_document(&doc, &mut ctx).await.unwrap();

    assert_eq!(ctx.response.content_type, "text/html");
    assert_eq!(ctx.response.data, json!("<h1>hi</h1>"));
}

#[tokio::test]
async fn missing_workflow_name_and_unknown_workflow_fail_fast() {
    let (runtime, _) = runtime();

    let mut ctx = ExecutionContext::new();
    let err = runtime.execute("", &mut ctx).await.unwrap_err();
    assert!(err.to_string().contains("name must be provided"));

    let err = runtime.execute("ghost", &mut ctx).await.unwrap_err();
    assert!(err.to_string().contains("ghost"));
}

#[tokio::test]
async fn remote_invocation_runs_as_one_off_workflow() {
    let (runtime, _) = runtime();

    let invocation: wfcore::RemoteInvocation = serde_json::from_value(json!({
        "request": { "method": "POST", "path": "/echo", "body": { "q": 1 } },
        "workflow": {
            "name": "one-off",
            "version": "1.0.0",
            "steps": [emit_step("solo")],
            "nodes": { "solo": { "inputs": { "value": "remote result" } } }
        }
    }))
    .unwrap();

    let (ctx, outcome) = runtime.execute_remote(invocation).await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(ctx.response.data, json!("remote result"));
    assert_eq!(ctx.request.method, "POST");
}
