//! HTTP server for the editor front end
//!
//! Serves the agent and chat SSE endpoints and the file endpoints over one
//! shared sandbox. Started via `start_server()`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{http::Method, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::agent::AgentRegistry;
use crate::core::{Config, Result};
use crate::llm::{CredentialResolver, OpenAiFactory, ProviderFactory};
use crate::tools::{Sandbox, ToolExecutor};

pub mod error;
pub mod routes;

pub use error::AppError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub executor: ToolExecutor,
    pub registry: Arc<AgentRegistry>,
    pub credentials: Arc<CredentialResolver>,
    pub providers: Arc<dyn ProviderFactory>,
}

impl AppState {
    /// Build state backed by the configured completion endpoint
    pub fn from_config(config: Config) -> Result<Self> {
        let providers = Arc::new(OpenAiFactory::new(config.llm.clone())?);
        Self::new(config, providers)
    }

    /// Build state with an explicit provider factory
    pub fn new(config: Config, providers: Arc<dyn ProviderFactory>) -> Result<Self> {
        let sandbox = Sandbox::open(&config.sandbox.data_dir)?;
        let registry = AgentRegistry::load(config.agent.prompts_dir.as_deref())?;
        let credentials = CredentialResolver::from_config(&config.credentials);

        Ok(Self {
            config: Arc::new(config),
            executor: ToolExecutor::new(sandbox),
            registry: Arc::new(registry),
            credentials: Arc::new(credentials),
            providers,
        })
    }

    pub fn sandbox(&self) -> &Sandbox {
        self.executor.sandbox()
    }
}

/// Build the router with all routes
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .nest("/api", routes::api_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server and block until shutdown
pub async fn start_server(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = config.bind_addr().parse()?;
    let state = AppState::from_config(config)?;

    tracing::info!(
        sandbox = %state.sandbox().root().display(),
        model = %state.config.llm.model,
        "Sandbox ready"
    );
    let app = build_router(state);

    tracing::info!("Quill server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
