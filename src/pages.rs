use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::error;

use crate::{
    AppState,
    login::{CurrentUser, session_user},
};

#[derive(Debug, Deserialize)]
pub struct StaticQuery {
    v: Option<String>,
}

/// GET / - the dashboard, or a redirect to the login page
pub async fn index_handler(State(app_state): State<AppState>, headers: HeaderMap) -> Response {
    let user = match session_user(&headers, &app_state).await {
        Ok(Some(user)) => user,
        Ok(None) => return Redirect::to("/login").into_response(),
        Err(e) => {
            error!("Failed to look up session: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let default_text = CurrentUser(user.clone()).default_watermark_text();

    let mut globals = page_globals(&app_state, "Add Watermark").await;
    globals.insert("user_name".into(), liquid::model::Value::scalar(user.name));
    globals.insert("user_email".into(), liquid::model::Value::scalar(user.email));
    globals.insert("default_text".into(), liquid::model::Value::scalar(default_text));

    render_page(&app_state, "index.html.liquid", globals).await
}

/// GET /login
pub async fn login_page_handler(State(app_state): State<AppState>, headers: HeaderMap) -> Response {
    auth_page(&app_state, &headers, "login.html.liquid", "Log in").await
}

/// GET /signup
pub async fn signup_page_handler(State(app_state): State<AppState>, headers: HeaderMap) -> Response {
    auth_page(&app_state, &headers, "signup.html.liquid", "Sign up").await
}

pub async fn static_file_handler(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<StaticQuery>,
    headers: HeaderMap,
) -> Response {
    app_state
        .static_handler
        .serve(&path, query.v.is_some(), &headers)
        .await
}

/// Login and signup pages bounce an already signed-in visitor to the dashboard
async fn auth_page(app_state: &AppState, headers: &HeaderMap, template: &str, title: &str) -> Response {
    if let Ok(Some(_)) = session_user(headers, app_state).await {
        return Redirect::to("/").into_response();
    }

    let globals = page_globals(app_state, title).await;
    render_page(app_state, template, globals).await
}

async fn page_globals(app_state: &AppState, title: &str) -> liquid::Object {
    let script_url = app_state
        .static_handler
        .get_versioned_url("/static/app.js")
        .await;
    let style_url = app_state
        .static_handler
        .get_versioned_url("/static/style.css")
        .await;
    let max_file_mb = (app_state.config.uploads.max_file_bytes / (1024 * 1024)) as i64;

    liquid::object!({
        "app_name": app_state.config.app.name.clone(),
        "page_title": title.to_string(),
        "script_url": script_url,
        "style_url": style_url,
        "max_file_mb": max_file_mb,
    })
}

async fn render_page(app_state: &AppState, template: &str, globals: liquid::Object) -> Response {
    match app_state
        .template_engine
        .render_template(template, globals)
        .await
    {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Template rendering error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
