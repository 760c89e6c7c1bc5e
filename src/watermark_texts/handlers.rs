use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;

use super::CreateTextRequest;
use crate::{
    AppState,
    database::{WatermarkText, WatermarkTextRepo},
    error::{ApiError, ApiResult},
    login::CurrentUser,
};

/// GET /api/watermark-texts
pub async fn list_texts(
    State(app_state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<WatermarkText>>> {
    let texts = WatermarkTextRepo::list_for_owner(app_state.database.pool(), &user.id).await?;
    Ok(Json(texts))
}

/// POST /api/watermark-texts
pub async fn create_text(
    State(app_state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<CreateTextRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let text = request
        .trimmed_text()
        .ok_or_else(|| ApiError::Validation("Text is required".to_string()))?;

    let row = WatermarkTextRepo::create(app_state.database.pool(), &user.id, text).await?;
    info!("Watermark text {} created for {}", row.id, user.email);

    Ok((StatusCode::CREATED, Json(row)))
}

/// DELETE /api/watermark-texts/{id}
///
/// Someone else's text answers exactly like a missing one.
pub async fn delete_text(
    State(app_state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    if !WatermarkTextRepo::delete_for_owner(app_state.database.pool(), &id, &user.id).await? {
        return Err(ApiError::NotFound("Not found".to_string()));
    }

    info!("Watermark text {} deleted by {}", id, user.email);
    Ok(Json(json!({ "ok": true })))
}
