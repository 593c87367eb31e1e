//! Chat and message persistence endpoints
//!
//! All routes here resolve the owner from `x-user-id` and never expose
//! another owner's data; a foreign chat id reads as not found.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::error;

use tidechat_core::ai::title::DEFAULT_TITLE;
use tidechat_core::storage::{ChatStore, MessageStore};

use crate::routes::{json_error, lock_db, require_user};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateChat {
    pub title: Option<String>,
}

#[derive(Deserialize)]
pub struct RenameChat {
    pub title: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessage {
    pub role: String,
    pub content: String,
    pub file_name: Option<String>,
    pub file_url: Option<String>,
}

fn storage_failure(context: &str, e: anyhow::Error) -> Response {
    error!("{context}: {e}");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Storage operation failed")
}

/// `GET /api/chats` - list the owner's chats, newest activity first
pub async fn list(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user_id = match require_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let db = match lock_db(&state.db) {
        Ok(db) => db,
        Err(response) => return response,
    };

    match ChatStore::new(&db).list_chats(&user_id) {
        Ok(chats) => Json(chats).into_response(),
        Err(e) => storage_failure("Failed to list chats", e),
    }
}

/// `POST /api/chats` - create a chat
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateChat>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let db = match lock_db(&state.db) {
        Ok(db) => db,
        Err(response) => return response,
    };

    let title = body.title.as_deref().unwrap_or(DEFAULT_TITLE);
    match ChatStore::new(&db).create_chat(&user_id, title) {
        Ok(chat) => (StatusCode::CREATED, Json(chat)).into_response(),
        Err(e) => storage_failure("Failed to create chat", e),
    }
}

/// `PATCH /api/chats/{id}` - rename a chat
pub async fn rename(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
    Json(body): Json<RenameChat>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let db = match lock_db(&state.db) {
        Ok(db) => db,
        Err(response) => return response,
    };

    match ChatStore::new(&db).update_title(&user_id, &chat_id, &body.title) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => json_error(StatusCode::NOT_FOUND, "Chat not found"),
        Err(e) => storage_failure("Failed to rename chat", e),
    }
}

/// `DELETE /api/chats/{id}` - delete a chat and its messages
pub async fn delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let db = match lock_db(&state.db) {
        Ok(db) => db,
        Err(response) => return response,
    };

    match ChatStore::new(&db).delete_chat(&user_id, &chat_id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => json_error(StatusCode::NOT_FOUND, "Chat not found"),
        Err(e) => storage_failure("Failed to delete chat", e),
    }
}

/// `GET /api/chats/{id}/messages` - load a chat's messages in order
pub async fn list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let db = match lock_db(&state.db) {
        Ok(db) => db,
        Err(response) => return response,
    };

    match MessageStore::new(&db).load_messages(&user_id, &chat_id) {
        Ok(Some(messages)) => Json(messages).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "Chat not found"),
        Err(e) => storage_failure("Failed to load messages", e),
    }
}

/// `POST /api/chats/{id}/messages` - append a message to a chat
pub async fn create_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
    Json(body): Json<CreateMessage>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    if body.role != "user" && body.role != "assistant" {
        return json_error(StatusCode::BAD_REQUEST, "Role must be user or assistant");
    }
    let db = match lock_db(&state.db) {
        Ok(db) => db,
        Err(response) => return response,
    };

    match MessageStore::new(&db).save_message(
        &user_id,
        &chat_id,
        &body.role,
        &body.content,
        body.file_name.as_deref(),
        body.file_url.as_deref(),
    ) {
        Ok(Some(message)) => (StatusCode::CREATED, Json(message)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "Chat not found"),
        Err(e) => storage_failure("Failed to save message", e),
    }
}
