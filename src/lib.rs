use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod api;
pub mod backup;
pub mod database;
pub mod error;
pub mod login;
pub mod pages;
pub mod startup_checks;
pub mod static_files;
pub mod templating;
pub mod watermark;
pub mod watermark_texts;

/// Session secret shipped in `Config::default()`. Startup checks warn when it is still in use.
pub const DEFAULT_SESSION_SECRET: &str = "change-me-in-production";

/// Environment variable that overrides `backup.secret`
pub const BACKUP_SECRET_ENV: &str = "BACKUP_SECRET";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub uploads: UploadConfig,
    pub watermark: WatermarkConfig,
    pub templates: TemplateConfig,
    pub static_files: StaticConfig,
    pub backup: BackupConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
    pub session_secret: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest single file accepted by `POST /api/watermark`
    pub max_file_bytes: usize,
    /// Cap on the whole multipart body
    pub max_request_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Extra font file loaded into the overlay font database. Defaults to the bundled DejaVu Sans.
    pub font_path: Option<PathBuf>,
    /// Family used for the generic `sans-serif` overlay font. When unset, the first
    /// installed family from a short list of common sans faces is used.
    pub font_family: Option<String>,
    pub load_system_fonts: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Bearer secret for `GET /api/admin/backup`. Unset disables the endpoint.
    pub secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Filigrane".to_string(),
            log_level: "info".to_string(),
            session_secret: DEFAULT_SESSION_SECRET.to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/filigrane.db"),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            max_request_bytes: 100 * 1024 * 1024,
        }
    }
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            font_path: Some(PathBuf::from("static/DejaVuSans.ttf")),
            font_family: None,
            load_system_fonts: true,
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("templates"),
        }
    }
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("static"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml_edit::de::Error),
}

impl Config {
    /// Parse a TOML config file. Missing sections and keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml_edit::de::from_str::<Config>(&content)?)
    }

    /// Apply `BACKUP_SECRET` from the environment over the file value
    pub fn with_env_overrides(self) -> Self {
        self.with_backup_secret(std::env::var(BACKUP_SECRET_ENV).ok())
    }

    fn with_backup_secret(mut self, secret: Option<String>) -> Self {
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            self.backup.secret = Some(secret);
        }
        self
    }
}

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub template_engine: Arc<templating::TemplateEngine>,
    pub static_handler: static_files::StaticFileHandler,
    pub compositor: watermark::Compositor,
    pub database: database::Database,
    pub config: Config,
}

pub async fn create_app(config: Config, database: database::Database) -> Router {
    let template_engine = Arc::new(templating::TemplateEngine::new(
        config.templates.directory.clone(),
    ));

    let static_handler =
        static_files::StaticFileHandler::new(config.static_files.directory.clone());

    let compositor = watermark::Compositor::new(&config.watermark);

    let upload_limit = DefaultBodyLimit::max(config.uploads.max_request_bytes);

    let app_state = AppState {
        template_engine,
        static_handler,
        compositor,
        database,
        config,
    };

    Router::new()
        .route("/", get(pages::index_handler))
        .route("/login", get(pages::login_page_handler))
        .route("/signup", get(pages::signup_page_handler))
        .route("/api/auth/signup", post(login::signup))
        .route("/api/auth/login", post(login::login))
        .route("/api/auth/logout", post(login::logout))
        .route("/api/auth/session", get(login::session))
        .route(
            "/api/watermark",
            post(watermark::watermark_handler).layer(upload_limit),
        )
        .route(
            "/api/watermark/overlay",
            get(watermark::overlay_preview_handler),
        )
        .route(
            "/api/watermark-texts",
            get(watermark_texts::list_texts).post(watermark_texts::create_text),
        )
        .route(
            "/api/watermark-texts/{id}",
            delete(watermark_texts::delete_text),
        )
        .route("/api/admin/backup", get(backup::backup_handler))
        .route("/static/{*path}", get(pages::static_file_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let method = request.method();
                    let uri = request.uri();
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %method,
                        uri = %uri,
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let headers = request.headers();
                    let user_agent = headers
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %request.method(),
                        path = %request.uri().path(),
                        user_agent = %user_agent,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let size = response
                            .headers()
                            .get("content-length")
                            .and_then(|h| h.to_str().ok())
                            .unwrap_or("-");

                        tracing::info!(
                            target: "access_log",
                            status = %response.status(),
                            size = %size,
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}
