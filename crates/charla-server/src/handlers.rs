//! HTTP boundary handlers.
//!
//! The boundary only ever sees "turn succeeded with reply" or "turn failed,
//! no reply": generation failures become a generic apology text, storage
//! failures become an error envelope. Raw infrastructure errors never cross
//! this layer.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use charla_core::ids::{ConversationId, WEB_USER};
use charla_engine::TurnError;

use crate::server::AppState;

/// Sent in place of a reply when generation fails; internal detail stays in
/// the logs.
pub const FALLBACK_REPLY: &str =
    "Lo siento, tuve un problema para responderte. ¿Probás de nuevo en un rato?";

const DEFAULT_TENANT: &str = "web";

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClearRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
}

fn conversation_id(raw: Option<String>) -> ConversationId {
    match raw {
        Some(id) if !id.trim().is_empty() => ConversationId::from_raw(id),
        _ => ConversationId::web_user(),
    }
}

fn success(extra: Value) -> Value {
    let mut body = json!({"status": "success"});
    if let (Some(obj), Some(add)) = (body.as_object_mut(), extra.as_object()) {
        for (k, v) in add {
            obj.insert(k.clone(), v.clone());
        }
    }
    body
}

fn error_body(message: &str) -> Value {
    json!({"status": "error", "message": message})
}

pub async fn post_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> (StatusCode, Json<Value>) {
    let message = match req.message.as_deref().map(str::trim) {
        Some(m) if !m.is_empty() => m.to_owned(),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(error_body("Message content is required")),
            )
        }
    };

    let id = conversation_id(req.conversation_id);
    let name = req.name.unwrap_or_else(|| WEB_USER.to_owned());
    let tenant = req.tenant.unwrap_or_else(|| DEFAULT_TENANT.to_owned());

    match state.orchestrator.respond(&tenant, &id, &name, &message).await {
        Ok(reply) => (StatusCode::OK, Json(success(json!({"response": reply})))),
        Err(TurnError::Generation(e)) => {
            error!(error = %e, kind = e.error_kind(), "turn failed in generation");
            (
                StatusCode::OK,
                Json(success(json!({"response": FALLBACK_REPLY}))),
            )
        }
        Err(TurnError::Storage(e)) => {
            error!(error = %e, "turn failed in storage");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(error_body("Service temporarily unavailable")),
            )
        }
    }
}

pub async fn get_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> (StatusCode, Json<Value>) {
    let id = conversation_id(params.conversation_id);

    match state.orchestrator.history(&id) {
        Ok(turns) => (
            StatusCode::OK,
            Json(success(json!({"history": turns}))),
        ),
        Err(e) => {
            error!(error = %e, "history lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(error_body("Could not read history")),
            )
        }
    }
}

pub async fn post_clear(
    State(state): State<AppState>,
    Json(req): Json<ClearRequest>,
) -> (StatusCode, Json<Value>) {
    let id = conversation_id(req.conversation_id);

    match state.orchestrator.clear(&id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(success(json!({"message": format!("History cleared for {id}")}))),
        ),
        Err(e) => {
            error!(error = %e, "clear failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(error_body("Service temporarily unavailable")),
            )
        }
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}
