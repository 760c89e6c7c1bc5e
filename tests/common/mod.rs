#![allow(dead_code)]

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use filigrane::{Config, create_app, database::Database};
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::json;
use std::{io::Cursor, path::PathBuf};
use tempfile::TempDir;

pub const PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub server: TestServer,
    pub database: Database,
    pub config: Config,
    // Keeps the database directory alive for the duration of the test
    _dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// App backed by a scratch database, serving the repository's templates and static files
pub async fn spawn_app_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    let dir = TempDir::new().unwrap();
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

    let mut config = Config::default();
    config.app.log_level = "error".to_string();
    config.app.session_secret = "test-session-secret".to_string();
    config.database.path = dir.path().join("data/test.db");
    config.templates.directory = root.join("templates");
    config.static_files.directory = root.join("static");
    config.watermark.load_system_fonts = false;
    config.watermark.font_path = Some(root.join("static/DejaVuSans.ttf"));
    customize(&mut config);

    let database = Database::connect(&config.database.path).await.unwrap();
    let app = create_app(config.clone(), database.clone()).await;
    let server = TestServer::new(app).unwrap();

    TestApp {
        server,
        database,
        config,
        _dir: dir,
    }
}

/// Create an account and return a `Cookie` header value for its session
pub async fn signup(server: &TestServer, name: &str, email: &str) -> HeaderValue {
    let response = server
        .post("/api/auth/signup")
        .json(&json!({ "name": name, "email": email, "password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    session_cookie(&response)
}

/// `name=value` part of the response's `Set-Cookie` header
pub fn session_cookie(response: &axum_test::TestResponse) -> HeaderValue {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response sets a cookie")
        .to_str()
        .unwrap()
        .to_string();
    let pair = set_cookie.split(';').next().unwrap();
    HeaderValue::from_str(pair).unwrap()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 90])
        })),
        ImageFormat::Png,
    )
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([40, 80, 120]))),
        ImageFormat::Jpeg,
    )
}

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    bytes
}
