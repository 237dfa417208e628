// crates/stepcli/src/main.rs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stepcore::{ExecutionEvent, Map, NodeEvent, NodeSpec, Value, WorkflowDefinition};
use stepruntime::{load_definition, FlowRuntime, NodeRegistry, RunInput, ValidatedWorkflow};

#[derive(Parser)]
#[command(name = "stepflow")]
#[command(about = "Stepflow workflow CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,
        
        /// Trigger payload as a JSON object
        #[arg(short, long)]
        payload: Option<String>,
        
        /// Extra initial state as a JSON object
        #[arg(short, long)]
        state: Option<String>,
        
        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },
    
    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },
    
    /// List available node types
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
            payload,
            state,
            verbose,
        } => {
            let default_level = if verbose { "debug" } else { "info" };
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
                )
                .with_writer(std::io::stderr)
                .init();
            
            run_workflow(&file, payload.as_deref(), state.as_deref()).await?;
        }
        
        Commands::Validate { file } => {
            validate_workflow(&file)?;
        }
        
        Commands::Nodes => {
            list_nodes();
        }
        
        Commands::Init { output } => {
            create_example_workflow(&output)?;
        }
    }
    
    Ok(())
}

fn standard_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    stepnodes::register_all(&mut registry);
    registry
}

/// Parse an optional `--payload`/`--state` argument into a JSON object
fn parse_object(arg: Option<&str>, name: &str) -> Result<Option<Map<String, Value>>> {
    let Some(raw) = arg else {
        return Ok(None);
    };
    let value = serde_json::from_str::<Value>(raw)
        .with_context(|| format!("--{} is not valid JSON", name))?;
    match value {
        Value::Object(map) => Ok(Some(map)),
        _ => bail!("--{} must be a JSON object", name),
    }
}

async fn run_workflow(file: &Path, payload: Option<&str>, state: Option<&str>) -> Result<()> {
    eprintln!("🚀 Loading workflow from: {}", file.display());
    let workflow = load_definition(file)?;
    tracing::debug!(
        "Loaded {} nodes and {} edges from {}",
        workflow.nodes.len(),
        workflow.edges.len(),
        file.display()
    );
    
    let input = RunInput {
        payload: parse_object(payload, "payload")?,
        initial_state: parse_object(state, "state")?,
    };
    
    let runtime = FlowRuntime::with_registry(
        Arc::new(standard_registry()),
        stepruntime::RuntimeConfig::default(),
    );
    
    // Progress goes to stderr so stdout stays valid JSON
    let mut events = runtime.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::RunStarted { entry, .. } => {
                    eprintln!("▶️  Run started at {}", entry);
                }
                ExecutionEvent::NodeStarted { node_id, node_type, .. } => {
                    eprintln!("  ⚡ Starting node: {} ({})", node_id, node_type);
                }
                ExecutionEvent::NodeCompleted { node_id, port, duration_ms, .. } => {
                    match port {
                        Some(port) => eprintln!(
                            "  ✅ Node {} completed in {}ms -> {}",
                            node_id, duration_ms, port
                        ),
                        None => eprintln!("  ✅ Node {} completed in {}ms", node_id, duration_ms),
                    }
                }
                ExecutionEvent::NodeFailed { node_id, error, .. } => {
                    eprintln!("  ❌ Node {} failed: {}", node_id, error);
                }
                ExecutionEvent::NodeEvent { node_id, event, .. } => match event {
                    NodeEvent::Info { message } => {
                        eprintln!("     ℹ️  [{}] {}", node_id, message);
                    }
                    NodeEvent::Warning { message } => {
                        eprintln!("     ⚠️  [{}] {}", node_id, message);
                    }
                },
                ExecutionEvent::RunCompleted { success, steps, duration_ms, .. } => {
                    if success {
                        eprintln!("✨ Run completed: {} steps in {}ms", steps, duration_ms);
                    } else {
                        eprintln!("💥 Run stopped after {} steps ({}ms)", steps, duration_ms);
                    }
                }
            }
        }
    });
    
    let result = runtime.run(&workflow, input).await;
    
    // Dropping the runtime closes the bus and ends the listener
    drop(runtime);
    let _ = event_task.await;
    
    let result = result?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    
    Ok(())
}

fn validate_workflow(file: &Path) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());
    
    let workflow = load_definition(file)?;
    let validated = ValidatedWorkflow::new(&workflow)?;
    let entry = validated.resolve_entry()?;
    
    println!("✅ Workflow is valid:");
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Edges: {}", workflow.edges.len());
    println!("   Entry: {}", entry);
    
    for node_id in validated.unreachable_from(entry) {
        println!("⚠️  Node '{}' is unreachable from '{}'", node_id, entry);
    }
    
    let registry = standard_registry();
    for node in &workflow.nodes {
        if !registry.contains(&node.node_type) {
            println!("⚠️  Node '{}' has unknown type '{}'", node.id, node.node_type);
        }
    }
    
    Ok(())
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();
    
    let registry = standard_registry();
    for node_type in registry.list_node_types() {
        if let Some(metadata) = registry.get_metadata(&node_type) {
            println!("  • {} ({})", node_type, metadata.category);
            println!("    {}", metadata.description);
            if !metadata.ports.is_empty() {
                println!("    ports: {}", metadata.ports.join(", "));
            }
        } else {
            println!("  • {}", node_type);
        }
    }
}

/// trigger -> chat -> condition -> (vip | standard)
fn example_workflow() -> WorkflowDefinition {
    let mut workflow = WorkflowDefinition::new();
    workflow.add_node(NodeSpec::new("webhook", "trigger.webhook"));
    workflow.add_node(
        NodeSpec::new("welcome", "action.chat").with_config(
            "system_prompt",
            "Write a short welcome message for {{payload.customer_name}}. \
             Reply as JSON with a \"message\" field.",
        ),
    );
    workflow.add_node(
        NodeSpec::new("is_vip", "logic.condition")
            .with_config("left", "{{payload.tier}}")
            .with_config("op", "==")
            .with_config("right", "vip"),
    );
    workflow.add_node(NodeSpec::new("vip_done", "logic.end"));
    workflow.add_node(NodeSpec::new("standard_done", "logic.end"));
    
    workflow.connect("webhook", "welcome");
    workflow.connect("welcome", "is_vip");
    workflow.connect_port("is_vip", "true", "vip_done");
    workflow.connect_port("is_vip", "false", "standard_done");
    workflow
}

fn create_example_workflow(output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&example_workflow())?;
    std::fs::write(output, json)?;
    
    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  stepflow run --file {} --payload '{{\"customer_name\": \"Ada\", \"tier\": \"vip\"}}'",
        output.display()
    );
    
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_parse_object_requires_json_object() {
        assert_eq!(parse_object(None, "payload").unwrap(), None);
        
        let parsed = parse_object(Some(r#"{"a": 1}"#), "payload").unwrap().unwrap();
        assert_eq!(parsed.get("a"), Some(&Value::from(1)));
        
        assert!(parse_object(Some("[1, 2]"), "payload").is_err());
        assert!(parse_object(Some("{oops"), "state").is_err());
    }
    
    #[test]
    fn test_example_workflow_is_valid() {
        let workflow = example_workflow();
        let validated = ValidatedWorkflow::new(&workflow).unwrap();
        
        assert_eq!(validated.resolve_entry().unwrap(), "webhook");
        assert!(validated.unreachable_from("webhook").is_empty());
        
        let registry = standard_registry();
        assert!(workflow.nodes.iter().all(|n| registry.contains(&n.node_type)));
    }
    
    #[test]
    fn test_init_writes_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflow.json");
        
        create_example_workflow(&path).unwrap();
        
        let loaded = load_definition(&path).unwrap();
        assert_eq!(loaded, example_workflow());
    }
    
    #[tokio::test]
    async fn test_example_workflow_runs_on_mock_chat() {
        let mut registry = NodeRegistry::new();
        stepnodes::register_with(
            &mut registry,
            Arc::new(stepnodes::LogDelivery),
            stepnodes::ChatConfig::default(),
        );
        let runtime = FlowRuntime::with_registry(
            Arc::new(registry),
            stepruntime::RuntimeConfig::default(),
        );
        let payload = serde_json::json!({"customer_name": "Ada", "tier": "vip"});
        let input = RunInput::with_payload(payload.as_object().cloned().unwrap());
        
        let result = runtime.run(&example_workflow(), input).await.unwrap();
        
        assert_eq!(result.trace, vec!["webhook", "welcome", "is_vip", "vip_done"]);
        assert_eq!(
            result.state.lookup("nodes.welcome.generated_message").and_then(Value::as_str),
            Some("Welcome, Ada! We're so glad to have you here. If you need anything, just let us know!")
        );
    }
}
