use crate::{Config, DEFAULT_SESSION_SECRET};
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create database directory: {0}")]
    DatabaseDirectoryCreationFailed(#[from] std::io::Error),

    #[error("Static files directory does not exist")]
    StaticDirectoryMissing,

    #[error("Templates directory does not exist")]
    TemplatesDirectoryMissing,

    #[error("Font file does not exist: {0}")]
    FontFileMissing(String),
}

impl StartupCheckError {
    /// Critical failures stop the server, the rest are logged and tolerated
    pub fn is_critical(&self) -> bool {
        matches!(self, StartupCheckError::DatabaseDirectoryCreationFailed(_))
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    if let Some(db_dir) = config.database.path.parent()
        && !db_dir.as_os_str().is_empty()
    {
        if db_dir.exists() {
            info!("Database directory exists: {:?}", db_dir);
        } else {
            info!("Database directory does not exist, creating: {:?}", db_dir);
            if let Err(e) = tokio::fs::create_dir_all(db_dir).await {
                error!("Failed to create database directory: {}", e);
                errors.push(StartupCheckError::DatabaseDirectoryCreationFailed(e));
            }
        }
    }

    let static_dir = Path::new(&config.static_files.directory);
    if static_dir.exists() {
        info!("Static files directory exists: {:?}", static_dir);
    } else {
        warn!("Static files directory does not exist: {:?}", static_dir);
        errors.push(StartupCheckError::StaticDirectoryMissing);
    }

    let templates_dir = Path::new(&config.templates.directory);
    if templates_dir.exists() {
        info!("Templates directory exists: {:?}", templates_dir);
    } else {
        warn!("Templates directory does not exist: {:?}", templates_dir);
        warn!("This may cause issues with page rendering");
        errors.push(StartupCheckError::TemplatesDirectoryMissing);
    }

    if let Some(font_path) = &config.watermark.font_path {
        if font_path.exists() {
            info!("Watermark font file found: {:?}", font_path);
        } else {
            warn!("Watermark font file missing: {:?}", font_path);
            errors.push(StartupCheckError::FontFileMissing(
                font_path.display().to_string(),
            ));
        }
    }

    if config.app.session_secret == DEFAULT_SESSION_SECRET {
        warn!("app.session_secret is the built-in default, set a real secret in production");
    }

    if config.backup.secret.is_none() {
        info!("No backup secret configured, /api/admin/backup is disabled");
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
