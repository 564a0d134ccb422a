//! Authentication request handlers.

use axum::Json;
use axum::extract::State;
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::{AuthResponse, LoginRequest, LogoutResponse, RegisterRequest};
use crate::services::{auth, cookies};

/// Handles `POST /auth/register`.
pub async fn register_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let client = body.client_type.unwrap_or_default();
    let outcome = auth::register(
        state.store.as_ref(),
        &state.codec,
        &body.username,
        &body.email,
        &body.password,
        client,
    )
    .await?;

    let jar = jar.add(cookies::refresh_cookie(
        &state.config,
        &outcome.refresh_token,
        outcome.client,
    ));
    Ok((jar, Json(outcome.response)))
}

/// Handles `POST /auth/login`.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let client = body.client_type.unwrap_or_default();
    let outcome = auth::login(
        state.store.as_ref(),
        &state.codec,
        &body.username,
        &body.password,
        client,
    )
    .await?;

    let jar = jar.add(cookies::refresh_cookie(
        &state.config,
        &outcome.refresh_token,
        outcome.client,
    ));
    Ok((jar, Json(outcome.response)))
}

/// Handles `POST /auth/refresh`. The refresh token comes from the cookie,
/// never from the body.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let presented = jar
        .get(cookies::REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::Unauthorized("Missing refresh token".into()))?;

    let outcome = auth::refresh(state.store.as_ref(), &state.codec, &presented).await?;

    let jar = jar.add(cookies::refresh_cookie(
        &state.config,
        &outcome.refresh_token,
        outcome.client,
    ));
    Ok((jar, Json(outcome.response)))
}

/// Handles `POST /auth/logout`. Succeeds whether or not a live refresh
/// token was presented, and always clears the cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<LogoutResponse>)> {
    let presented = jar
        .get(cookies::REFRESH_COOKIE)
        .map(|c| c.value().to_string());
    auth::logout(state.store.as_ref(), &state.codec, presented.as_deref()).await;

    let jar = jar.add(cookies::clear_refresh_cookie(&state.config));
    Ok((jar, Json(LogoutResponse { success: true })))
}
