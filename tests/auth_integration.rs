mod common;

use axum::http::{StatusCode, header};
use common::{PASSWORD, session_cookie, signup, spawn_app};
use filigrane::database::UserRepo;
use serde_json::{Value, json};

#[tokio::test]
async fn test_signup_starts_a_session() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/api/auth/signup")
        .json(&json!({ "name": " Ada Lovelace ", "email": "Ada@Example.com", "password": PASSWORD }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.starts_with("session="));
    assert!(set_cookie.contains("HttpOnly"));

    let body: Value = response.json();
    assert_eq!(body["user"]["name"], "Ada Lovelace");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert!(body["user"].get("password_hash").is_none());

    let cookie = session_cookie(&response);
    let session = app
        .server
        .get("/api/auth/session")
        .add_header(header::COOKIE, cookie)
        .await;
    assert_eq!(session.status_code(), StatusCode::OK);
    assert_eq!(session.json::<Value>()["user"]["name"], "Ada Lovelace");
}

#[tokio::test]
async fn test_signup_rejects_duplicate_email() {
    let app = spawn_app().await;
    signup(&app.server, "Ada", "ada@example.com").await;

    let response = app
        .server
        .post("/api/auth/signup")
        .json(&json!({ "name": "Other Ada", "email": "ADA@example.com", "password": PASSWORD }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        "An account with this email already exists"
    );
}

#[tokio::test]
async fn test_signup_rejects_short_password() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/api/auth/signup")
        .json(&json!({ "name": "Ada", "email": "ada@example.com", "password": "short" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let users = UserRepo::list(app.database.pool()).await.unwrap();
    assert!(users.is_empty());
}

#[tokio::test]
async fn test_login() {
    let app = spawn_app().await;
    signup(&app.server, "Ada", "ada@example.com").await;

    let wrong = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "ada@example.com", "password": "not the password" }))
        .await;
    assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json::<Value>()["error"], "Unauthorized");

    let unknown = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "nobody@example.com", "password": PASSWORD }))
        .await;
    assert_eq!(unknown.status_code(), StatusCode::UNAUTHORIZED);

    let ok = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": " ADA@example.com ", "password": PASSWORD }))
        .await;
    assert_eq!(ok.status_code(), StatusCode::OK);
    assert_eq!(ok.json::<Value>()["user"]["email"], "ada@example.com");

    let session = app
        .server
        .get("/api/auth/session")
        .add_header(header::COOKIE, session_cookie(&ok))
        .await;
    assert_eq!(session.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = spawn_app().await;

    let response = app.server.post("/api/auth/logout").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_session_requires_valid_cookie() {
    let app = spawn_app().await;

    let missing = app.server.get("/api/auth/session").await;
    assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);

    let forged = app
        .server
        .get("/api/auth/session")
        .add_header(header::COOKIE, "session=someone:not-a-signature".parse::<axum::http::HeaderValue>().unwrap())
        .await;
    assert_eq!(forged.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_for_removed_account_is_rejected() {
    let app = spawn_app().await;
    let cookie = signup(&app.server, "Ada", "ada@example.com").await;

    assert!(
        UserRepo::delete_by_email(app.database.pool(), "ada@example.com")
            .await
            .unwrap()
    );

    let response = app
        .server
        .get("/api/auth/session")
        .add_header(header::COOKIE, cookie)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_json_credentials_are_json_bad_request() {
    let app = spawn_app().await;

    for path in ["/api/auth/signup", "/api/auth/login"] {
        let response = app.server.post(path).text("ada@example.com").await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["error"].is_string());
    }
}
