use axum::{
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::{
    AppState,
    api::{bearer_token, constant_time_eq},
    error::{ApiError, ApiResult},
};

/// GET /api/admin/backup
///
/// Streams a consistent snapshot of the database to a caller presenting
/// the backup secret as a bearer token.
pub async fn backup_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let Some(secret) = app_state
        .config
        .backup
        .secret
        .as_deref()
        .filter(|s| !s.is_empty())
    else {
        error!("Backup requested but no backup secret is configured");
        return Err(ApiError::Misconfigured("Backup not configured".to_string()));
    };

    let authorized = bearer_token(&headers).is_some_and(|token| constant_time_eq(token, secret));
    if !authorized {
        warn!("Rejected backup request with missing or wrong secret");
        return Err(ApiError::Unauthenticated);
    }

    let snapshot_path = snapshot_path();
    let snapshot = read_snapshot(&app_state, &snapshot_path).await;

    if let Err(e) = tokio::fs::remove_file(&snapshot_path).await {
        // VACUUM INTO may have failed before creating the file
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove backup snapshot {:?}: {}", snapshot_path, e);
        }
    }

    let bytes = snapshot?;
    info!("Database backup served ({} bytes)", bytes.len());

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", backup_file_name()),
            ),
        ],
        bytes,
    ))
}

async fn read_snapshot(app_state: &AppState, path: &Path) -> ApiResult<Vec<u8>> {
    app_state.database.backup_to(path).await?;
    tokio::fs::read(path)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to read backup snapshot: {}", e)))
}

fn snapshot_path() -> PathBuf {
    std::env::temp_dir().join(format!("filigrane-backup-{}.db", uuid::Uuid::new_v4()))
}

/// `backup-YYYY-MM-DD.db`, dated in UTC
pub fn backup_file_name() -> String {
    format!("backup-{}.db", Utc::now().format("%Y-%m-%d"))
}
