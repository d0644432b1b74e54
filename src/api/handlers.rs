//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    ChatRequest, ChatResponse, CurrentSessionResponse, ErrorResponse, SelectResponse,
    SessionListResponse, SessionResponse, StopResponse,
};
use super::AppState;
use crate::runtime::{RuntimeError, SseEvent};
use crate::session::{Session, SessionId, TranscriptView, NO_SESSION};
use crate::state_machine::TransitionError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Sessions
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/new", post(create_session))
        .route("/api/sessions/current", get(current_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/select", post(select_session))
        // Chat actions
        .route("/api/chat", post(send_chat))
        .route("/api/chat/stop", post(stop_reveal))
        // SSE streaming
        .route("/api/stream", get(stream))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

/// Render a session with the typing indicator only on the turn being revealed
fn render(state: &AppState, session: &Session) -> TranscriptView {
    let chat_state = state.runtime.state();
    TranscriptView::from(session).with_active_turn(chat_state.active_turn())
}

// ============================================================
// Sessions
// ============================================================

async fn list_sessions(State(state): State<AppState>) -> Json<SessionListResponse> {
    let sessions = state.runtime.sessions();
    Json(SessionListResponse {
        sessions: sessions.sessions(),
        current: sessions.current_id(),
    })
}

async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state
        .runtime
        .sessions()
        .create_session()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(SessionResponse {
        session: render(&state, &session),
    }))
}

async fn current_session(State(state): State<AppState>) -> Json<CurrentSessionResponse> {
    let session = state.runtime.sessions().current();
    Json(CurrentSessionResponse {
        placeholder: session.is_none().then_some(NO_SESSION),
        session: session.map(|s| render(&state, &s)),
    })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state
        .runtime
        .sessions()
        .get(SessionId(id))
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))?;

    Ok(Json(SessionResponse {
        session: render(&state, &session),
    }))
}

async fn select_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Json<SelectResponse> {
    let sessions = state.runtime.sessions();
    let selected = sessions.select_session(SessionId(id));

    Json(SelectResponse {
        selected,
        session: sessions.current().map(|s| render(&state, &s)),
    })
}

// ============================================================
// Chat Actions
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    // The runtime rejects this too; checking here gives the caller a status code
    if state.runtime.state().is_busy() {
        return Err(AppError::Conflict(TransitionError::Busy.to_string()));
    }

    let submission = state.runtime.submit(req.text).await.map_err(|e| match e {
        RuntimeError::EmptyMessage => AppError::BadRequest(e.to_string()),
        other => AppError::Internal(other.to_string()),
    })?;

    Ok(Json(ChatResponse {
        queued: true,
        session_id: submission.session_id,
        turn_id: submission.turn_id,
    }))
}

async fn stop_reveal(State(state): State<AppState>) -> Result<Json<StopResponse>, AppError> {
    state
        .runtime
        .stop()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(StopResponse { ok: true }))
}

// ============================================================
// SSE Streaming
// ============================================================

async fn stream(State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe before reading the snapshot so no update falls in between
    let broadcast_rx = state.runtime.subscribe();

    let chat_state = state.runtime.state();
    let session = state
        .runtime
        .sessions()
        .current()
        .map(|s| TranscriptView::from(&s).with_active_turn(chat_state.active_turn()));

    let init_event = SseEvent::Init {
        session: serde_json::to_value(session).unwrap_or(Value::Null),
        state: serde_json::to_value(&chat_state).unwrap_or(Value::Null),
    };

    sse_stream(init_event, broadcast_rx)
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("nourish-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
