use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use tracing::{info, warn};

use crate::{
    AppState,
    database::{NewUser, User, UserRepo},
    error::{ApiError, ApiResult},
};

use super::{
    CurrentUser, LoginError, LoginRequest, SessionResponse, SessionUser, SignupRequest,
    clear_session_cookie, password, session_cookie,
};

pub async fn signup(
    State(app_state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let request = request.normalized().map_err(LoginError::Invalid)?;

    if UserRepo::find_by_email(app_state.database.pool(), &request.email)
        .await?
        .is_some()
    {
        return Err(LoginError::EmailTaken.into());
    }

    let plain_password = request.password.clone();
    let password_hash = run_blocking(move || password::hash_password(&plain_password))
        .await?
        .map_err(LoginError::from)?;

    let user = UserRepo::create(
        app_state.database.pool(),
        &NewUser {
            name: request.name,
            email: request.email,
            password_hash,
        },
    )
    .await
    .map_err(|e| {
        if e.is_unique_violation() {
            LoginError::EmailTaken
        } else {
            LoginError::Database(e)
        }
    })?;

    info!("Account created for {}", user.email);

    let headers = session_headers(&app_state, &user)?;
    Ok((
        StatusCode::CREATED,
        headers,
        Json(SessionResponse {
            user: SessionUser::from(&user),
        }),
    ))
}

pub async fn login(
    State(app_state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let email = request.email.trim().to_lowercase();

    let Some(user) = UserRepo::find_by_email(app_state.database.pool(), &email).await? else {
        warn!("Login failed - unknown account");
        return Err(LoginError::InvalidCredentials.into());
    };

    let stored_hash = user.password_hash.clone();
    let valid = run_blocking(move || password::verify_password(&request.password, &stored_hash))
        .await?
        .map_err(LoginError::from)?;

    if !valid {
        warn!("Login failed - wrong password for {}", user.email);
        return Err(LoginError::InvalidCredentials.into());
    }

    info!("User {} logged in successfully", user.email);

    let headers = session_headers(&app_state, &user)?;
    Ok((
        headers,
        Json(SessionResponse {
            user: SessionUser::from(&user),
        }),
    ))
}

pub async fn logout() -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&clear_session_cookie()) {
        headers.insert(SET_COOKIE, value);
    }

    (headers, Json(serde_json::json!({ "ok": true })))
}

pub async fn session(CurrentUser(user): CurrentUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        user: SessionUser::from(&user),
    })
}

fn session_headers(app_state: &AppState, user: &User) -> ApiResult<HeaderMap> {
    let cookie = session_cookie(&app_state.config.app.session_secret, &user.id)
        .map_err(ApiError::Internal)?;
    let value = HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(e.to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, value);
    Ok(headers)
}

/// Password hashing is CPU-bound, keep it off the async workers
async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))
}
