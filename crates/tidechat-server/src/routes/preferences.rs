//! Per-user preference endpoints

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use tidechat_core::storage::Preferences;
use tidechat_core::ProviderId;

use crate::routes::{json_error, lock_db, require_user};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SetModel {
    pub model: ProviderId,
}

/// `GET /api/preferences/model` - the owner's preferred completion provider
pub async fn get_model(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user_id = match require_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let db = match lock_db(&state.db) {
        Ok(db) => db,
        Err(response) => return response,
    };

    let model = Preferences::for_user(&db, &user_id).get_model();
    Json(json!({ "model": model })).into_response()
}

/// `PUT /api/preferences/model` - store the preferred completion provider
pub async fn set_model(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SetModel>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let db = match lock_db(&state.db) {
        Ok(db) => db,
        Err(response) => return response,
    };

    match Preferences::for_user(&db, &user_id).set_model(body.model) {
        Ok(()) => Json(json!({ "model": body.model })).into_response(),
        Err(e) => {
            error!("Failed to save model preference: {e}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Storage operation failed")
        }
    }
}
