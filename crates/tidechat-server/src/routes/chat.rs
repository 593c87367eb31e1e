//! Streaming completion endpoint

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, info};

use tidechat_core::constants;
use tidechat_core::storage::Preferences;
use tidechat_core::{ChatRequest, ProviderError};

use crate::routes::{lock_db, optional_user};
use crate::state::AppState;

/// `POST /api/chat` - open a completion stream
///
/// The body is validated by hand before deserialization so a malformed
/// request reports what was actually received.
pub async fn completion(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

    if !parsed
        .get("messages")
        .map(Value::is_array)
        .unwrap_or(false)
    {
        return invalid_messages_response(&parsed);
    }

    let model_in_body = parsed.get("model").map(|m| !m.is_null()).unwrap_or(false);
    let mut request: ChatRequest = match serde_json::from_value(parsed) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Failed to process request",
                    "message": e.to_string(),
                })),
            )
                .into_response();
        }
    };

    // A body without a selector runs the caller's stored preference, when
    // one exists; anonymous requests keep the default provider
    if !model_in_body {
        if let Some(user_id) = optional_user(&headers) {
            if let Ok(db) = lock_db(&state.db) {
                request.model = Preferences::for_user(&db, &user_id).get_model();
            }
        }
    }

    match state.gateway.stream_completion(&request).await {
        Ok(outcome) => {
            info!(
                "Streaming completion from {} (fallback: {})",
                outcome.provider, outcome.fell_back
            );
            let stream = UnboundedReceiverStream::new(outcome.stream)
                .map(|fragment| Ok::<_, Infallible>(Bytes::from(fragment)));
            (
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                Body::from_stream(stream),
            )
                .into_response()
        }
        Err(e) => provider_error_response(&e),
    }
}

fn invalid_messages_response(body: &Value) -> Response {
    let received_keys: Vec<&str> = body
        .as_object()
        .map(|obj| obj.keys().map(String::as_str).collect())
        .unwrap_or_default();
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "Messages must be an array",
            "receivedKeys": received_keys,
            "bodyType": json_type_name(body),
        })),
    )
        .into_response()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Map a terminal provider failure to the client-facing JSON envelope
fn provider_error_response(error: &ProviderError) -> Response {
    error!("Chat completion failed: {}", error);

    if error.is_quota() {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "API quota exceeded",
                "message": "You've exceeded the daily API request limit. Please try again later or upgrade your API plan.",
                "details": "The free tier allows 20 requests per day. Please wait 24 hours or upgrade your Google Gemini API plan.",
                "retryAfter": constants::ai::QUOTA_RETRY_AFTER_SECS,
            })),
        )
            .into_response();
    }

    let status = error
        .status
        .and_then(|s| StatusCode::from_u16(s).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({
            "error": "Failed to process request",
            "message": error.message,
            "details": error.message,
        })),
    )
        .into_response()
}
