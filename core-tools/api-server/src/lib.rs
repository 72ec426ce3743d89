//! API Server
//!
//! HTTP front end for the Switchboard query service. The server only knows
//! the [`QueryService`](sdk::QueryService) trait; the engine plugs its
//! dispatcher in through a [`ServiceHandle`].
//!
//! # Endpoints
//!
//! - POST /generate - Route a prompt and return the answer
//! - GET / - Service name and integration flags
//! - GET /health - Liveness and per-integration connection state

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sdk::{EngineError, IntegrationStatus, ServiceHandle};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Value of the `message` field on `GET /`
pub const SERVICE_MESSAGE: &str = "Switchboard API";

/// Body of `POST /generate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

/// Response of `POST /generate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
}

/// Response of `GET /`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub asana_integration: String,
    pub knowledge_base_integration: String,
}

/// Response of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub services: HealthServices,
}

/// Per-integration section of [`HealthResponse`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthServices {
    pub asana_mcp: IntegrationStatus,
    pub knowledge_base: IntegrationStatus,
}

/// Engine failure rendered as `500 {"detail": ...}`
#[derive(Debug)]
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("Error processing request: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

/// Build the application router over a query service
pub fn router(service: ServiceHandle) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/generate", post(generate_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// HTTP server bound to a local address
pub struct ApiServer {
    listener: tokio::net::TcpListener,
    app: Router,
}

impl ApiServer {
    /// Bind the listener; the server does not accept requests until served
    pub async fn bind(addr: SocketAddr, service: ServiceHandle) -> Result<Self, EngineError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| EngineError::Network(format!("Failed to bind to {}: {}", addr, e)))?;

        Ok(Self {
            listener,
            app: router(service),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr, EngineError> {
        self.listener
            .local_addr()
            .map_err(|e| EngineError::Network(format!("Failed to get local address: {}", e)))
    }

    /// Serve until `signal` resolves, then drain in-flight requests
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), EngineError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        tracing::info!("API server listening on http://{}", addr);

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(async move {
                signal.await;
                tracing::info!("API server shutting down gracefully");
            })
            .await?;

        Ok(())
    }
}

async fn generate_handler(
    State(service): State<ServiceHandle>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    tracing::debug!("Received prompt ({} bytes)", request.prompt.len());
    let response = service.generate(&request.prompt).await?;
    Ok(Json(GenerateResponse { response }))
}

async fn root_handler(State(service): State<ServiceHandle>) -> Json<RootResponse> {
    let status = service.status();
    Json(RootResponse {
        message: SERVICE_MESSAGE.to_string(),
        asana_integration: status.tasks.label().to_string(),
        knowledge_base_integration: status.knowledge_base.label().to_string(),
    })
}

async fn health_handler(State(service): State<ServiceHandle>) -> Json<HealthResponse> {
    let status = service.status();
    Json(HealthResponse {
        status: "healthy".to_string(),
        services: HealthServices {
            asana_mcp: status.tasks,
            knowledge_base: status.knowledge_base,
        },
    })
}
