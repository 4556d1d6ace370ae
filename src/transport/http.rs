//! Relay HTTP server
//!
//! Lets a client that holds the user's keys reach providers it cannot call
//! itself. Every request carries its own key; the server stores none.

use crate::catalog::Catalog;
use crate::llm::{CompletionRequest, DirectDispatcher, LlmError, RelayReply, RelayRequest};
use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state
pub struct RelayState {
    catalog: Arc<Catalog>,
    dispatcher: DirectDispatcher,
}

impl RelayState {
    pub fn new(catalog: Arc<Catalog>, dispatcher: DirectDispatcher) -> Self {
        Self {
            catalog,
            dispatcher,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// One catalog entry as listed by `/api/models`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    id: String,
    name: String,
    provider: String,
    description: String,
    api_key_name: String,
}

/// Build the relay router
pub fn router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/models", get(list_models))
        .route("/api/chat", post(handle_chat))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve the relay on an already bound listener
pub async fn serve(listener: tokio::net::TcpListener, state: Arc<RelayState>) -> Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Run the relay server
pub async fn run_relay_server(host: &str, port: u16, catalog: Arc<Catalog>) -> Result<()> {
    let state = Arc::new(RelayState::new(catalog, DirectDispatcher::new()));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Relay server listening on {}", listener.local_addr()?);

    serve(listener, state).await
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn list_models(State(state): State<Arc<RelayState>>) -> Json<Vec<ModelInfo>> {
    let models = state
        .catalog
        .models()
        .iter()
        .map(|m| ModelInfo {
            id: m.id.clone(),
            name: m.name.clone(),
            provider: m.provider.to_string(),
            description: m.description.clone(),
            api_key_name: m.api_key_name.clone(),
        })
        .collect();
    Json(models)
}

async fn handle_chat(
    State(state): State<Arc<RelayState>>,
    body: Result<Json<RelayRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            tracing::debug!("Rejected relay body: {}", rejection);
            return reply_error(&LlmError::Validation(
                "Request body must be JSON".to_string(),
            ));
        }
    };

    let model = match validate(&state.catalog, &req) {
        Ok(model) => model,
        Err(e) => return reply_error(&e),
    };

    let request = CompletionRequest::new(model, &req.prompt, &req.api_key);
    match state.dispatcher.try_complete(request).await {
        Ok(content) => (StatusCode::OK, Json(RelayReply::content(content))),
        Err(e) => {
            tracing::error!("Relay completion for {} failed: {}", model.id, e);
            reply_error(&e)
        }
    }
}

/// Check fields in the order clients expect the messages
fn validate<'a>(
    catalog: &'a Catalog,
    req: &RelayRequest,
) -> Result<&'a crate::llm::ModelDescriptor, LlmError> {
    let missing = |what: &str| LlmError::Validation(format!("{what} is required"));
    if req.prompt.is_empty() {
        return Err(missing("Prompt"));
    }
    if req.model_id.is_empty() {
        return Err(missing("Model ID"));
    }
    if req.api_key.is_empty() {
        return Err(missing("API key"));
    }
    catalog
        .get(&req.model_id)
        .ok_or_else(|| LlmError::Validation("Invalid model ID".to_string()))
}

fn reply_error(err: &LlmError) -> (StatusCode, Json<RelayReply>) {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(RelayReply::error(err.to_string())))
}
