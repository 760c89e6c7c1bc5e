use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

use crate::{
    AppState,
    api::{create_signed_cookie, get_cookie_value, signed_cookie_value},
    database::{DatabaseError, User, UserRepo},
    error::ApiError,
};

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_MAX_AGE_SECONDS: u64 = 7 * 24 * 60 * 60;

/// `Set-Cookie` value that starts a session for `user_id`
pub fn session_cookie(secret: &str, user_id: &str) -> Result<String, String> {
    let signed_value = create_signed_cookie(secret, user_id)?;
    Ok(format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, signed_value, SESSION_MAX_AGE_SECONDS
    ))
}

/// `Set-Cookie` value that ends the session
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", SESSION_COOKIE)
}

/// Id of the user in a correctly signed session cookie
pub fn get_session_user_id(headers: &HeaderMap, secret: &str) -> Option<String> {
    get_cookie_value(headers, SESSION_COOKIE)
        .and_then(|signed_value| signed_cookie_value(secret, &signed_value))
}

/// Resolve the session cookie to a stored account.
///
/// A correctly signed cookie for an account that no longer exists yields
/// `None`, the same as no cookie at all.
pub async fn session_user(
    headers: &HeaderMap,
    app_state: &AppState,
) -> Result<Option<User>, DatabaseError> {
    match get_session_user_id(headers, &app_state.config.app.session_secret) {
        Some(user_id) => UserRepo::find_by_id(app_state.database.pool(), &user_id).await,
        None => Ok(None),
    }
}

/// The signed-in account. Rejects the request with 401 when there is none.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Text used when a request names no stored watermark text
    pub fn default_watermark_text(&self) -> String {
        format!("{} architecte", self.0.name)
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match session_user(&parts.headers, state).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => Err(ApiError::Unauthenticated),
        }
    }
}
