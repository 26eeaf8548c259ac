//! Push token registration.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use rollcall_model::StudentId;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::error::ApiError;
use super::json_body;
use super::request_context::RequestContext;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/save-token", post(save_token))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTokenRequest {
    pub user_id: Option<String>,
    pub expo_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaveTokenResponse {
    pub message: String,
}

/// POST /api/save-token
async fn save_token(
    State(state): State<AppState>,
    ctx: RequestContext,
    body: Result<Json<SaveTokenRequest>, JsonRejection>,
) -> Result<Json<SaveTokenResponse>, ApiError> {
    let req = json_body(body, &ctx)?;

    let user_id = req.user_id.as_deref().map(str::trim).unwrap_or_default();
    let token = req.expo_token.as_deref().map(str::trim).unwrap_or_default();
    if user_id.is_empty() || token.is_empty() {
        let field = if user_id.is_empty() { "userId" } else { "expoToken" };
        return Err(ApiError::invalid_field(field, "User ID and token are required")
            .with_request_id(ctx.request_id));
    }

    let user_id = StudentId::new(user_id);
    if let Err(e) = state.users().save_push_token(&user_id, token).await {
        error!(error = %e, user_id = %user_id, "Failed to save push token");
        return Err(ApiError::internal("internal_error", "Failed to save push token")
            .with_request_id(ctx.request_id));
    }

    info!(user_id = %user_id, "Push token saved");
    Ok(Json(SaveTokenResponse {
        message: "Token saved".to_string(),
    }))
}
