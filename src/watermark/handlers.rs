use axum::{
    Json,
    extract::{
        Multipart, Query, State,
        multipart::MultipartRejection,
        rejection::QueryRejection,
    },
    http::header,
    response::IntoResponse,
};
use base64::{Engine, engine::general_purpose};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Compositor, ImageKind, output_file_name, render_overlay};
use crate::{
    AppState,
    database::WatermarkTextRepo,
    error::{ApiError, ApiResult},
    login::CurrentUser,
};

const FILES_FIELD: &str = "files";
const TEXT_ID_FIELD: &str = "watermarkTextId";

/// One file part of an upload, alive only for the request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedImage {
    pub name: String,
    /// Base64 of the encoded output
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Serialize)]
pub struct WatermarkResponse {
    pub images: Vec<ProcessedImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayQuery {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub watermark_text_id: Option<String>,
}

/// POST /api/watermark
///
/// Watermarks every uploaded file with the same text. Every file is
/// checked before any is processed; the first bad file fails the whole
/// batch and nothing is returned.
pub async fn watermark_handler(
    State(app_state): State<AppState>,
    current_user: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<WatermarkResponse>> {
    let (files, text_id) = read_upload(multipart?).await?;

    if files.is_empty() {
        return Err(ApiError::Validation("No files provided".to_string()));
    }

    let kinds = validate_uploads(&files, app_state.config.uploads.max_file_bytes)?;
    let text = resolve_watermark_text(&app_state, &current_user, text_id.as_deref()).await?;

    info!(
        "Watermarking {} file(s) for {}",
        files.len(),
        current_user.0.email
    );

    let compositor = app_state.compositor.clone();
    let images = tokio::task::spawn_blocking(move || process_batch(&compositor, files, kinds, &text))
        .await
        .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))??;

    Ok(Json(WatermarkResponse { images }))
}

/// GET /api/watermark/overlay
///
/// Overlay markup for the dashboard preview, from the same renderer the
/// upload endpoint composites with.
pub async fn overlay_preview_handler(
    State(app_state): State<AppState>,
    current_user: CurrentUser,
    query: Result<Query<OverlayQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let (width, height) = match (query.width, query.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => (width, height),
        _ => {
            return Err(ApiError::Validation(
                "width and height must be positive integers".to_string(),
            ));
        }
    };

    let text =
        resolve_watermark_text(&app_state, &current_user, query.watermark_text_id.as_deref())
            .await?;
    let svg = render_overlay(width, height, &text);

    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        svg,
    ))
}

/// Text to stamp for this request.
///
/// Without an id the account's default text is used. With an id the text
/// must exist and belong to the caller; there is no fallback.
pub async fn resolve_watermark_text(
    app_state: &AppState,
    current_user: &CurrentUser,
    text_id: Option<&str>,
) -> ApiResult<String> {
    let Some(text_id) = text_id.filter(|id| !id.is_empty()) else {
        return Ok(current_user.default_watermark_text());
    };

    WatermarkTextRepo::find_for_owner(app_state.database.pool(), text_id, &current_user.0.id)
        .await?
        .map(|row| row.text)
        .ok_or_else(|| {
            warn!("Watermark text {} not found for {}", text_id, current_user.0.email);
            ApiError::NotFound("Watermark text not found".to_string())
        })
}

/// Check type and size of every file, in upload order
pub fn validate_uploads(files: &[UploadedFile], max_file_bytes: usize) -> ApiResult<Vec<ImageKind>> {
    files
        .iter()
        .map(|file| {
            let kind = ImageKind::from_mime_type(&file.mime_type).ok_or_else(|| {
                ApiError::Validation(format!(
                    "Invalid file type: {}. Accepted: PNG, JPEG",
                    file.mime_type
                ))
            })?;

            if file.bytes.len() > max_file_bytes {
                return Err(ApiError::Validation(format!(
                    "File {} exceeds {} limit",
                    file.name,
                    format_size_limit(max_file_bytes)
                )));
            }

            Ok(kind)
        })
        .collect()
}

async fn read_upload(mut multipart: Multipart) -> ApiResult<(Vec<UploadedFile>, Option<String>)> {
    let mut files = Vec::new();
    let mut text_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid upload: {}", e.body_text())))?
    {
        match field.name() {
            Some(FILES_FIELD) => {
                let name = field.file_name().unwrap_or("image").to_string();
                let mime_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Invalid upload: {}", e.body_text())))?;

                debug!("Received {} ({}, {} bytes)", name, mime_type, bytes.len());
                files.push(UploadedFile {
                    name,
                    mime_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some(TEXT_ID_FIELD) => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Invalid upload: {}", e.body_text())))?;
                text_id = Some(value.trim().to_string());
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    Ok((files, text_id))
}

fn process_batch(
    compositor: &Compositor,
    files: Vec<UploadedFile>,
    kinds: Vec<ImageKind>,
    text: &str,
) -> ApiResult<Vec<ProcessedImage>> {
    files
        .into_iter()
        .zip(kinds)
        .map(|(file, kind)| {
            let output = compositor.apply(&file.bytes, kind, text).map_err(|e| {
                warn!("Failed to watermark {}: {}", file.name, e);
                ApiError::from(e)
            })?;

            Ok(ProcessedImage {
                name: output_file_name(&file.name, kind),
                data: general_purpose::STANDARD.encode(output),
                mime_type: kind.mime_type().to_string(),
            })
        })
        .collect()
}

fn format_size_limit(bytes: usize) -> String {
    const MB: usize = 1024 * 1024;
    if bytes >= MB && bytes % MB == 0 {
        format!("{} MB", bytes / MB)
    } else {
        format!("{} bytes", bytes)
    }
}
