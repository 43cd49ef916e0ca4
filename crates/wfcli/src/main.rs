// crates/wfcli/src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use wfcore::{ExecutionContext, RequestContext, WorkflowDocument};
use wfruntime::{NodeRegistry, RuntimeConfig, WorkflowRuntime};

#[derive(Parser)]
#[command(name = "wf")]
#[command(about = "Workflow Engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to a workflow file (json, yaml or toml)
        #[arg(short, long)]
        file: PathBuf,

        /// Request body as a JSON string
        #[arg(short, long)]
        input: Option<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow file without executing it
    Validate {
        /// Path to a workflow file
        file: PathBuf,
    },

    /// List registered node types
    Nodes,

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            input,
            verbose,
        } => {
            if verbose {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::DEBUG)
                    .init();
            } else {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::INFO)
                    .init();
            }

            run_workflow(file, input).await?;
        }

        Commands::Validate { file } => {
            validate_workflow(file)?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Init { output } => {
            create_example_workflow(output)?;
        }
    }

    Ok(())
}

fn build_runtime() -> WorkflowRuntime {
    let mut registry = NodeRegistry::new();
    wfnodes::register_all(&mut registry);
    WorkflowRuntime::new(Arc::new(registry), RuntimeConfig::from_env())
}

async fn run_workflow(file: PathBuf, input: Option<String>) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());

    let document = WorkflowDocument::from_path(&file)?;

    println!("📋 Workflow: {}", document.name);
    println!("   Version: {}", document.version);
    println!("   Steps: {}", document.steps.len());
    println!();

    let body = match input {
        Some(raw) => serde_json::from_str(&raw)?,
        None => serde_json::Value::Null,
    };

    let runtime = build_runtime();
    let mut ctx = ExecutionContext::new().with_request(RequestContext {
        method: "CLI".to_string(),
        body,
        ..RequestContext::default()
    });

    let outcome = runtime.execute_document(&document, &mut ctx).await?;

    println!();
    println!("📊 Execution Summary:");
    println!("   Execution ID: {}", ctx.id);
    println!("   Outcome: {:?}", outcome);

    if ctx.response.success {
        println!();
        println!("📤 Response:");
        println!("{}", serde_json::to_string_pretty(&ctx.response.data)?);
    } else if let Some(error) = &ctx.response.error {
        println!();
        println!("💥 Step '{}' failed: {}", error.name, error.message);
        std::process::exit(1);
    }

    Ok(())
}

fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let document = WorkflowDocument::from_path(&file)?;
    let runtime = build_runtime();

    match runtime.validate(&document) {
        Ok(()) => {
            println!("✅ Workflow is valid:");
            println!("   Name: {}", document.name);
            println!("   Steps: {}", document.steps.len());
            println!("   Node entries: {}", document.nodes.len());
            Ok(())
        }
        Err(e) => {
            println!("❌ Workflow is invalid: {}", e);
            std::process::exit(1);
        }
    }
}

fn list_nodes() {
    println!("📦 Registered Node Types:");
    println!();

    let mut registry = NodeRegistry::new();
    wfnodes::register_all(&mut registry);

    for name in registry.node_names() {
        match registry.description(&name) {
            Some(description) if !description.is_empty() => {
                println!("  • {}", name);
                println!("    {}", description);
            }
            _ => println!("  • {}", name),
        }
    }
}

fn create_example_workflow(output: PathBuf) -> Result<()> {
    let example = serde_json::json!({
        "name": "countries",
        "version": "1.0.0",
        "description": "Fetch a country and reshape the response",
        "trigger": {
            "http": {
                "method": "GET",
                "path": "/countries"
            }
        },
        "steps": [
            { "name": "fetch", "node": "api-call", "type": "module" }
        ],
        "nodes": {
            "fetch": {
                "inputs": {
                    "url": "https://restcountries.com/v3.1/all",
                    "method": "GET"
                }
            }
        }
    });

    std::fs::write(&output, serde_json::to_string_pretty(&example)?)?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  wf run --file {}", output.display());

    Ok(())
}
