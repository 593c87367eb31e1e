//! HTTP route handlers

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub mod chat;
pub mod chats;
pub mod preferences;
pub mod title;

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat::completion))
        .route("/api/chat/title", post(title::generate))
        .route("/api/chats", get(chats::list).post(chats::create))
        .route(
            "/api/chats/{id}",
            axum::routing::patch(chats::rename).delete(chats::delete),
        )
        .route(
            "/api/chats/{id}/messages",
            get(chats::list_messages).post(chats::create_message),
        )
        .route(
            "/api/preferences/model",
            get(preferences::get_model).put(preferences::set_model),
        )
        .with_state(state)
}

/// JSON error response with an `{error: ...}` body
pub(crate) fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Lock the shared database for one storage operation
pub(crate) fn lock_db(
    db: &tidechat_core::storage::SharedDatabase,
) -> Result<std::sync::MutexGuard<'_, tidechat_core::storage::Database>, Response> {
    db.lock().map_err(|_| {
        json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Storage unavailable",
        )
    })
}

/// Read the request owner from the `x-user-id` header, if one was sent
pub(crate) fn optional_user(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Resolve the request owner from the `x-user-id` header
///
/// Storage routes are owner-scoped; a request without an identity cannot
/// touch any chat data.
pub(crate) fn require_user(headers: &HeaderMap) -> Result<String, Response> {
    optional_user(headers).ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "Unauthorized"))
}
