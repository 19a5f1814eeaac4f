//! REST adapter for the command interpreter
//!
//! Loads the caller's session, runs one turn and saves it back. Turns for the
//! same user are serialized with a per-user lock.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::context::store::SessionStore;
use crate::dispatcher::Interpreter;
use crate::models::{BotResponse, ConfirmationData, Product};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProcessRequest {
    pub user_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConfirmRequest {
    pub user_id: Option<String>,
    pub confirmation_data: ConfirmationData,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub interpreter: Arc<Interpreter>,
    pub sessions: Arc<dyn SessionStore>,
    user_locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl ApiState {
    pub fn new(interpreter: Arc<Interpreter>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            interpreter,
            sessions,
            user_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn lock_for(&self, user_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks.entry(user_id).or_default().clone()
    }
}

/// =============================
/// Helpers
/// =============================

fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Accept real UUIDs and map any other identifier (phone number, chat id)
/// to a stable one
fn resolve_user_id(value: Option<&str>) -> Uuid {
    match value {
        Some(v) if !v.trim().is_empty() => {
            Uuid::parse_str(v.trim()).unwrap_or_else(|_| stable_uuid_from_string(v.trim()))
        }
        _ => stable_uuid_from_string("anonymous-user"),
    }
}

fn reply(response: BotResponse) -> (StatusCode, Json<ApiResponse>) {
    (StatusCode::OK, Json(ApiResponse::success(response)))
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Conversation Endpoints
/// =============================

async fn process_message(
    State(state): State<ApiState>,
    Json(req): Json<ProcessRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let user_id = resolve_user_id(req.user_id.as_deref());
    info!(%user_id, products = req.products.len(), "Received message");

    let lock = state.lock_for(user_id).await;
    let _turn = lock.lock().await;

    let mut session = match state.sessions.load(user_id).await {
        Ok(session) => session,
        Err(e) => {
            error!(%user_id, error = %e, "Failed to load session");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Failed to load session: {}", e))),
            );
        }
    };

    let response = state
        .interpreter
        .process(&mut session, &req.message, &req.products)
        .await;

    if let Err(e) = state.sessions.save(&session).await {
        error!(%user_id, error = %e, "Failed to save session");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to save session: {}", e))),
        );
    }

    reply(response)
}

async fn confirm_action(
    State(state): State<ApiState>,
    Json(req): Json<ConfirmRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let user_id = resolve_user_id(req.user_id.as_deref());
    let confirmation_id = req.confirmation_data.confirmation_id;
    info!(%user_id, %confirmation_id, "Received confirmation");

    let lock = state.lock_for(user_id).await;
    let _turn = lock.lock().await;

    let response = state
        .interpreter
        .confirm_and_execute(&req.confirmation_data, user_id)
        .await;

    // The proposal is settled either way; a later "sim" must not re-run it
    match state.sessions.load(user_id).await {
        Ok(mut session) => {
            session.settle_confirmation(confirmation_id);
            if let Err(e) = state.sessions.save(&session).await {
                error!(%user_id, error = %e, "Failed to save session");
            }
        }
        Err(e) => error!(%user_id, error = %e, "Failed to load session"),
    }

    reply(response)
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/process", post(process_message))
        .route("/api/confirm", post(confirm_action))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
