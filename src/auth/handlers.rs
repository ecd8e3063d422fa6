use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::identity::{self, NewUser};
use crate::auth::session;
use crate::error::{AppError, AppResult};
use crate::extractors::{session_token, CurrentUser, JsonBody};
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

fn required<'a>(value: &'a Option<String>, field: &str) -> AppResult<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{} is required", field)))
}

// -- Handlers --

/// POST /auth/register: create an account (no session is issued)
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> AppResult<Response> {
    let new = NewUser {
        email: required(&req.email, "email")?,
        name: required(&req.name, "name")?,
        password: required(&req.password, "password")?,
        role: required(&req.role, "role")?,
    };

    let conn = state.db.get()?;
    let user = identity::register(&conn, new, state.config.auth.bcrypt_cost)?;

    Ok((StatusCode::CREATED, Json(user)).into_response())
}

/// POST /auth/login: verify credentials and set the session cookie
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> AppResult<Response> {
    let email = required(&req.email, "email")?;
    let password = required(&req.password, "password")?;

    let conn = state.db.get()?;
    let user = identity::authenticate(&conn, email, password).inspect_err(|_| {
        tracing::warn!("Failed login attempt");
    })?;
    let token = session::create_session(&conn, user.id, state.config.auth.session_hours)?;
    tracing::info!("User {} logged in", user.id);

    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );
    let current: CurrentUser = user.into();

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(current),
    )
        .into_response())
}

/// POST /auth/logout: delete the session (if any) and clear the cookie
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;

    if let Some(token) = session_token(&headers, cookie_name) {
        let conn = state.db.get()?;
        session::delete_session(&conn, token)?;
    }

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie(cookie_name))],
        Json(json!({ "ok": true })),
    )
        .into_response())
}

/// GET /auth/me: the identity behind the current session
pub async fn me(user: CurrentUser) -> Json<CurrentUser> {
    Json(user)
}
