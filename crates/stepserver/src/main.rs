use actix_cors::Cors;
use actix_web::{
    error::InternalError, get, post, web, App, HttpResponse, HttpServer, Responder,
    Result as ActixResult,
};
use actix_ws::Message;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use stepcore::{FlowError, Map, Value, WorkflowDefinition, WorkflowError};
use stepruntime::{load_definitions_dir, FlowRuntime, RunInput};
use tracing::{error, info, warn};
use uuid::Uuid;

const DEFAULT_OWNER: &str = "default";

/// Application state shared across handlers
struct AppState {
    runtime: Arc<FlowRuntime>,
}

/// Request body for running an ad-hoc workflow
#[derive(Debug, Deserialize)]
struct RunFlowRequest {
    workflow: WorkflowDefinition,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
    #[serde(default)]
    initial_state: Option<Map<String, Value>>,
}

/// Request body for saving a workflow
#[derive(Debug, Deserialize)]
struct SaveFlowRequest {
    owner: Option<String>,
    name: Option<String>,
    workflow: WorkflowDefinition,
}

#[derive(Debug, Deserialize)]
struct OwnerQuery {
    owner: Option<String>,
}

/// Response for workflow creation
#[derive(Debug, Serialize)]
struct SaveFlowResponse {
    id: Uuid,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(e: &FlowError) -> HttpResponse {
    let body = ErrorResponse {
        error: e.to_string(),
    };
    match e {
        FlowError::Workflow(WorkflowError::NotFound(_)) => HttpResponse::NotFound().json(body),
        FlowError::Workflow(_) | FlowError::UnknownNodeType { .. } => {
            HttpResponse::BadRequest().json(body)
        }
        _ => HttpResponse::InternalServerError().json(body),
    }
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "stepflow"
    }))
}

/// List available node types
#[get("/nodes")]
async fn list_node_types(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let registry = data.runtime.registry();
    
    let nodes: Vec<_> = registry
        .list_node_types()
        .iter()
        .map(|node_type| {
            let metadata = registry.get_metadata(node_type).unwrap_or_default();
            serde_json::json!({
                "type": node_type,
                "description": metadata.description,
                "category": metadata.category,
                "config": metadata.config,
                "ports": metadata.ports,
            })
        })
        .collect();
    
    Ok(HttpResponse::Ok().json(nodes))
}

/// Run a workflow supplied in the request body
#[post("/run-flow")]
async fn run_flow(
    data: web::Data<AppState>,
    req: web::Json<RunFlowRequest>,
) -> ActixResult<impl Responder> {
    let req = req.into_inner();
    let input = RunInput {
        payload: req.payload,
        initial_state: req.initial_state,
    };
    
    match data.runtime.run(&req.workflow, input).await {
        Ok(result) => {
            info!(
                "Run {} finished after {} steps ({:?})",
                result.execution_id,
                result.trace.len(),
                result.halt_reason
            );
            Ok(HttpResponse::Ok().json(result))
        }
        Err(e) => {
            warn!("Run rejected: {}", e);
            Ok(error_response(&e))
        }
    }
}

/// Save a workflow definition
#[post("/flows")]
async fn create_flow(
    data: web::Data<AppState>,
    req: web::Json<SaveFlowRequest>,
) -> ActixResult<impl Responder> {
    let req = req.into_inner();
    let owner = req.owner.as_deref().unwrap_or(DEFAULT_OWNER);
    
    match data.runtime.store().put(owner, req.name, req.workflow).await {
        Ok(id) => {
            info!("Saved workflow {} for {}", id, owner);
            Ok(HttpResponse::Created().json(SaveFlowResponse { id }))
        }
        Err(e) => {
            error!("Failed to save workflow: {}", e);
            Ok(error_response(&e))
        }
    }
}

/// List one owner's saved workflows
#[get("/flows")]
async fn list_flows(
    data: web::Data<AppState>,
    query: web::Query<OwnerQuery>,
) -> ActixResult<impl Responder> {
    let owner = query.owner.as_deref().unwrap_or(DEFAULT_OWNER);
    
    match data.runtime.store().list(owner).await {
        Ok(flows) => Ok(HttpResponse::Ok().json(flows)),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Get a saved workflow
#[get("/flows/{id}")]
async fn get_flow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    match data.runtime.store().get(path.into_inner()).await {
        Ok(stored) => Ok(HttpResponse::Ok().json(stored)),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Run a saved workflow
#[post("/flows/{id}/run")]
async fn run_saved_flow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();
    
    // An empty body runs with no payload; anything else must be valid input
    let input = if body.iter().all(u8::is_ascii_whitespace) {
        RunInput::default()
    } else {
        match serde_json::from_slice::<RunInput>(&body) {
            Ok(input) => input,
            Err(e) => {
                return Ok(HttpResponse::BadRequest().json(ErrorResponse {
                    error: format!("Invalid run input: {}", e),
                }))
            }
        }
    };
    
    info!("Running saved workflow: {}", workflow_id);
    match data.runtime.run_stored(workflow_id, input).await {
        Ok(result) => Ok(HttpResponse::Ok().json(result)),
        Err(e) => {
            warn!("Saved workflow {} rejected: {}", workflow_id, e);
            Ok(error_response(&e))
        }
    }
}

/// WebSocket endpoint for real-time events
#[get("/events")]
async fn websocket_events(
    req: actix_web::HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;
    
    info!("WebSocket client connected");
    let mut events = data.runtime.subscribe_events();
    
    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            if let Ok(json) = serde_json::to_string(&event) {
                                if session.text(json).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("WebSocket client lagged, {} events dropped", skipped);
                        }
                        Err(_) => break,
                    }
                }
                
                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                
                else => break,
            }
        }
        
        info!("WebSocket client disconnected");
        let _ = session.close(None).await;
    });
    
    Ok(res)
}

/// Malformed JSON bodies get the same `{ error }` shape as rejected runs
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let body = ErrorResponse {
            error: err.to_string(),
        };
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(health_check)
        .service(list_node_types)
        .service(run_flow)
        .service(create_flow)
        .service(list_flows)
        .service(get_flow)
        .service(run_saved_flow)
        .service(websocket_events);
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    
    info!("🚀 Starting Stepflow Server");
    
    let mut registry = stepruntime::NodeRegistry::new();
    stepnodes::register_all(&mut registry);
    
    let runtime = FlowRuntime::with_registry(
        Arc::new(registry),
        stepruntime::RuntimeConfig::default(),
    );
    
    if let Ok(dir) = std::env::var("FLOWS_DIR") {
        let loaded = load_definitions_dir(Path::new(&dir), runtime.store().as_ref(), DEFAULT_OWNER)
            .await?;
        info!("📂 Seeded {} workflows from {}", loaded, dir);
    }
    
    info!("✅ Runtime initialized with standard nodes");
    
    let app_state = web::Data::new(AppState {
        runtime: Arc::new(runtime),
    });
    
    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    
    info!("🌐 Server starting on http://{}", bind_address);
    
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
            .configure(configure)
    })
    .bind(&bind_address)?
    .run()
    .await?;
    
    Ok(())
}
