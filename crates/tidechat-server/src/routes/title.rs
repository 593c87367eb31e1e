//! Title generation endpoint
//!
//! Best-effort by contract: apart from a completely missing user message,
//! every failure mode degrades to a deterministic local title with a 200.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use tidechat_core::ai::title::fallback_title;

use crate::routes::json_error;
use crate::state::AppState;

/// `POST /api/chat/title` - generate a conversation title
pub async fn generate(State(state): State<AppState>, body: String) -> Response {
    let parsed: Value = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            // Unreadable body still yields a usable title
            warn!("Malformed title request body: {}", e);
            return Json(json!({ "title": fallback_title("") })).into_response();
        }
    };

    let user_message = match parsed.get("userMessage").and_then(Value::as_str) {
        Some(message) => message,
        None => return json_error(StatusCode::BAD_REQUEST, "User message is required"),
    };
    let assistant_response = parsed.get("assistantResponse").and_then(Value::as_str);

    let title = state.titles.generate(user_message, assistant_response).await;
    Json(json!({ "title": title })).into_response()
}
