use super::*;
use crate::database::User;
use axum::http::{HeaderMap, HeaderValue};

fn signup(name: &str, email: &str, password: &str) -> SignupRequest {
    SignupRequest {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    }
}

#[test]
fn test_signup_normalization() {
    let normalized = signup("  Léonore Grec ", " Leonore@Example.COM ", "longenough")
        .normalized()
        .unwrap();
    assert_eq!(normalized.name, "Léonore Grec");
    assert_eq!(normalized.email, "leonore@example.com");
    assert_eq!(normalized.password, "longenough");
}

#[test]
fn test_signup_validation() {
    assert!(signup("   ", "a@example.com", "longenough").normalized().is_err());
    assert!(signup("Ada", "not-an-email", "longenough").normalized().is_err());
    assert!(signup("Ada", "ada@localhost", "longenough").normalized().is_err());
    assert!(signup("Ada", "@example.com", "longenough").normalized().is_err());
    assert!(signup("Ada", "ada@example.com", "short").normalized().is_err());
}

#[test]
fn test_session_cookie_round_trip() {
    let cookie = session_cookie("secret", "user-42").unwrap();
    assert!(cookie.starts_with("session=user-42:"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Max-Age=604800"));

    let pair = cookie.split(';').next().unwrap();
    let mut headers = HeaderMap::new();
    headers.insert("cookie", HeaderValue::from_str(pair).unwrap());

    assert_eq!(
        get_session_user_id(&headers, "secret"),
        Some("user-42".to_string())
    );
    assert_eq!(get_session_user_id(&headers, "another-secret"), None);
}

#[test]
fn test_clear_session_cookie_expires_immediately() {
    let cookie = clear_session_cookie();
    assert!(cookie.starts_with("session=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[test]
fn test_default_watermark_text() {
    let user = CurrentUser(User {
        id: "1".to_string(),
        name: "Léonore Grec".to_string(),
        email: "leonore@example.com".to_string(),
        password_hash: String::new(),
        created_at: chrono::Utc::now(),
    });
    assert_eq!(user.default_watermark_text(), "Léonore Grec architecte");
}
