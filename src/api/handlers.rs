//! HTTP request handlers

use super::types::{ConversationResponse, ErrorResponse, MenusResponse, UpdateRequest};
use super::AppState;
use crate::runtime::{DispatchError, DispatchOutcome};
use crate::store::StateStore;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Normalized updates from the feed
        .route("/api/updates", post(post_update))
        // Stored conversation state
        .route("/api/conversations/:id", get(get_conversation))
        .route("/api/menus", get(list_menus))
        .route("/version", get(get_version))
        .with_state(state)
}

async fn post_update(
    State(state): State<AppState>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<DispatchOutcome>, AppError> {
    let event = req.into_event().map_err(AppError::BadRequest)?;
    tracing::debug!(
        conv_id = %event.conversation_id,
        event_id = %event.event_id,
        kind = ?event.kind,
        "Update received"
    );
    let outcome = state.dispatcher.dispatch(event).await?;
    Ok(Json(outcome))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    let conversation = state
        .dispatcher
        .store()
        .load(&id)
        .await
        .map_err(|e| AppError::Unavailable(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("Conversation not found: {id}")))?;

    Ok(Json(ConversationResponse {
        conversation_id: id,
        state: conversation,
    }))
}

async fn list_menus(State(state): State<AppState>) -> Json<MenusResponse> {
    let registry = state.dispatcher.registry();
    Json(MenusResponse {
        root: registry.root().to_string(),
        menus: registry.menu_ids().into_iter().map(str::to_string).collect(),
    })
}

async fn get_version() -> &'static str {
    concat!("telemenu ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    NotFound(String),
    /// Store down; the feed should retry
    Unavailable(String),
    /// Render could not be delivered
    BadGateway(String),
    Internal(String),
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::Store(e) => AppError::Unavailable(e.to_string()),
            DispatchError::Sink(e) => AppError::BadGateway(e.to_string()),
            e @ DispatchError::RuntimeStopped(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
