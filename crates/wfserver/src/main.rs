use actix_cors::Cors;
use actix_web::{get, web, App, HttpRequest, HttpResponse, HttpServer, Responder};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;
use wfcore::{
    envelope, route, EngineError, ExecutionContext, NodeExecutionError, RequestContext,
    WorkflowDocument,
};
use wfruntime::{NodeRegistry, RuntimeConfig, WorkflowRuntime};

/// Header marking a POST body as a remote node invocation envelope.
const EXECUTE_NODE_HEADER: &str = "x-workflow-execute-node";

/// Application state shared across handlers
struct AppState {
    runtime: Arc<WorkflowRuntime>,
}

#[derive(Serialize)]
struct SuccessBody {
    success: bool,
    data: serde_json::Value,
    #[serde(rename = "executionId")]
    execution_id: Uuid,
}

#[derive(Serialize)]
struct FailureBody {
    success: bool,
    error: NodeExecutionError,
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "wfserver"
    }))
}

/// Catch-all trigger: resolves the workflow named by the request path,
/// builds a fresh graph and walks it. Every request owns its own
/// context; the runtime is the only shared state.
async fn dispatch(req: HttpRequest, body: web::Bytes, data: web::Data<AppState>) -> HttpResponse {
    let runtime = &data.runtime;

    let remote = req
        .headers()
        .get(EXECUTE_NODE_HEADER)
        .and_then(|v| v.to_str().ok())
        == Some("true");
    if remote && req.method() == actix_web::http::Method::POST {
        return execute_remote_node(runtime, &body).await;
    }

    let path = req.path().to_string();
    let Some(name) = route::extract_workflow_name(&path) else {
        return HttpResponse::BadRequest().json(FailureBody {
            success: false,
            error: NodeExecutionError::new("trigger", "Missing workflow name in path")
                .with_code(400),
        });
    };

    let Some(document) = runtime.document(name).await else {
        return HttpResponse::NotFound().json(FailureBody {
            success: false,
            error: NodeExecutionError::new("trigger", format!("Workflow '{}' not found", name))
                .with_code(404),
        });
    };

    let request = build_request(&req, &body, &document, &path);
    let mut ctx = ExecutionContext::new().with_request(request);
    ctx.logger.log(format!(
        "Version: {}, Method: {}",
        document.version,
        req.method()
    ));

    match runtime.execute_document(&document, &mut ctx).await {
        Ok(_) => respond(ctx),
        Err(e) => engine_error_response(e),
    }
}

async fn execute_remote_node(runtime: &Arc<WorkflowRuntime>, body: &web::Bytes) -> HttpResponse {
    let raw = match std::str::from_utf8(body) {
        Ok(raw) => raw,
        Err(_) => {
            return HttpResponse::BadRequest().json(FailureBody {
                success: false,
                error: NodeExecutionError::new("trigger", "Request body must be UTF-8")
                    .with_code(400),
            })
        }
    };

    let invocation = match envelope::decode(raw) {
        Ok(invocation) => invocation,
        Err(e) => {
            return HttpResponse::BadRequest().json(FailureBody {
                success: false,
                error: NodeExecutionError::new("trigger", e.to_string()).with_code(400),
            })
        }
    };

    match runtime.execute_remote(invocation).await {
        Ok((ctx, _)) => respond(ctx),
        Err(e) => engine_error_response(e),
    }
}

/// Assemble the request snapshot, including path parameters extracted
/// from the workflow's trigger route template.
fn build_request(
    req: &HttpRequest,
    body: &web::Bytes,
    document: &WorkflowDocument,
    path: &str,
) -> RequestContext {
    let template = document
        .trigger
        .http
        .as_ref()
        .map(|h| h.path.as_str())
        .unwrap_or("/:workflow");

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
        .collect();

    let query: HashMap<String, String> =
        serde_urlencoded::from_str(req.query_string()).unwrap_or_default();

    let body = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(body)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(body).into()))
    };

    RequestContext {
        method: req.method().to_string(),
        path: path.to_string(),
        headers,
        query,
        params: route::match_route(template, path),
        body,
    }
}

/// Response contract: success carries data and the execution id;
/// failure carries the wrapped error under its own status code.
fn respond(ctx: ExecutionContext) -> HttpResponse {
    if ctx.response.success {
        let mut response = HttpResponse::Ok();
        response.insert_header(("x-workflow-execution-id", ctx.id.to_string()));
        response.json(SuccessBody {
            success: true,
            data: ctx.response.data,
            execution_id: ctx.id,
        })
    } else {
        let error = ctx
            .response
            .error
            .unwrap_or_else(|| NodeExecutionError::new("unknown", "Workflow execution failed"));
        let status = actix_web::http::StatusCode::from_u16(error.code)
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
        HttpResponse::build(status).json(FailureBody {
            success: false,
            error,
        })
    }
}

fn engine_error_response(e: EngineError) -> HttpResponse {
    error!("Request failed before execution: {}", e);
    let (status, code) = match e {
        EngineError::Build(_) | EngineError::Decode(_) => (HttpResponse::BadRequest(), 400),
        _ => (HttpResponse::InternalServerError(), 500),
    };
    let mut status = status;
    status.json(FailureBody {
        success: false,
        error: NodeExecutionError::new("trigger", e.to_string()).with_code(code),
    })
}

/// Load workflow documents from a directory into the runtime's store.
async fn load_workflows(runtime: &WorkflowRuntime, dir: &std::path::Path) -> anyhow::Result<usize> {
    let mut loaded = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let known = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("json") | Some("yaml") | Some("yml") | Some("toml")
        );
        if !known {
            continue;
        }

        match WorkflowDocument::from_path(&path) {
            Ok(document) => {
                info!("Loaded workflow '{}' from {}", document.name, path.display());
                runtime.register_document(document).await;
                loaded += 1;
            }
            Err(e) => error!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(loaded)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("Starting workflow trigger server");

    let mut registry = NodeRegistry::new();
    wfnodes::register_all(&mut registry);

    let runtime = Arc::new(WorkflowRuntime::new(
        Arc::new(registry),
        RuntimeConfig::from_env(),
    ));

    if let Ok(dir) = std::env::var("WORKFLOWS_PATH") {
        let count = load_workflows(&runtime, std::path::Path::new(&dir)).await?;
        info!("Registered {} workflow(s)", count);
    }

    let app_state = web::Data::new(AppState {
        runtime: runtime.clone(),
    });

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:4000".to_string());
    info!("Server listening on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .service(health_check)
            .default_service(web::route().to(dispatch))
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
