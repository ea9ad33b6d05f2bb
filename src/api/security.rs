//! Account API endpoints
//!
//! Handles HTTP requests for user accounts:
//! - GET /api/v1/security/login, /register, /reset - form data (the flash)
//! - POST /api/v1/security/register - create a pending account
//! - GET /api/v1/security/verify/{token} - activate it
//! - POST /api/v1/security/login, /logout - open and close a session
//! - GET /api/v1/security/page - the signed-in user (requires a session)
//! - POST /api/v1/security/reset, GET/POST /api/v1/security/reset/{token}
//!
//! The session token travels in the `session` cookie; `Bearer` headers are
//! accepted as well by the auth middleware.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    middleware as axum_middleware,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::flash::{redirect, redirect_with, Flash, FlashMessage};
use crate::api::middleware::{
    extract_session_token, require_auth, ApiError, AppState, AuthenticatedUser,
};
use crate::models::User;
use crate::services::{LoginInput, RegisterInput, UserServiceError};

const LOGIN: &str = "/security/login";
const CLEAR_SESSION: &str = "session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";

/// Request body of `POST /reset`
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

/// Request body of `POST /reset/{token}`
#[derive(Debug, Deserialize)]
pub struct NewPasswordRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct FormResponse {
    pub flash: Option<FlashMessage>,
}

#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub user: User,
    pub flash: Option<FlashMessage>,
}

#[derive(Debug, Serialize)]
pub struct ResetFormResponse {
    pub email: String,
}

/// Build the security router
pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/page", get(page))
        .route_layer(axum_middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/login", get(form).post(login))
        .route("/register", get(form).post(register))
        .route("/verify/{token}", get(verify))
        .route("/logout", post(logout))
        .route("/reset", get(form).post(request_reset))
        .route("/reset/{token}", get(reset_form).post(reset_password))
        .merge(protected)
}

fn flash_to_login(state: &AppState, flash: FlashMessage) -> Response {
    redirect_with(LOGIN, flash, state.auth_config.flash_seconds)
}

/// GET /login, /register and /reset
async fn form(flash: Flash) -> Response {
    let body = FormResponse {
        flash: flash.message(),
    };
    flash.respond(Json(body))
}

/// POST /api/v1/security/register
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<Response, ApiError> {
    state.user_service.register(input).await?;
    Ok(flash_to_login(
        &state,
        FlashMessage::success("Account created. Check your email to activate it"),
    ))
}

/// GET /api/v1/security/verify/{token}
async fn verify(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    state.user_service.verify(&token).await?;
    Ok(flash_to_login(
        &state,
        FlashMessage::success("Account activated. You can sign in now"),
    ))
}

/// POST /api/v1/security/login
///
/// Bad credentials come back to the login form with a danger flash rather
/// than as a 401.
async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Response, ApiError> {
    let session = match state.user_service.login(input).await {
        Ok(session) => session,
        Err(UserServiceError::AuthenticationError(message)) => {
            return Ok(flash_to_login(&state, FlashMessage::danger(message)));
        }
        Err(e) => return Err(e.into()),
    };

    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.id,
        state.user_service.session_lifetime().num_seconds()
    );
    let cookie = HeaderValue::from_str(&cookie)
        .map_err(|_| ApiError::internal_error("Failed to build session cookie"))?;

    let mut response = redirect("/security/page");
    response.headers_mut().append(header::SET_COOKIE, cookie);
    Ok(response)
}

/// GET /api/v1/security/page
async fn page(AuthenticatedUser(user): AuthenticatedUser, flash: Flash) -> Response {
    let body = PageResponse {
        user,
        flash: flash.message(),
    };
    flash.respond(Json(body))
}

/// POST /api/v1/security/logout
///
/// Works without a session too, so a stale cookie can always be cleared.
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }

    let mut response = flash_to_login(&state, FlashMessage::success("Signed out"));
    response
        .headers_mut()
        .append(header::SET_COOKIE, HeaderValue::from_static(CLEAR_SESSION));
    Ok(response)
}

/// POST /api/v1/security/reset
///
/// Answers the same whether or not the address belongs to an account.
async fn request_reset(
    State(state): State<AppState>,
    Json(body): Json<ResetRequest>,
) -> Result<Response, ApiError> {
    state.user_service.request_reset(&body.email).await?;
    Ok(flash_to_login(
        &state,
        FlashMessage::success("If the address is registered, a reset link has been sent"),
    ))
}

/// GET /api/v1/security/reset/{token}
async fn reset_form(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ResetFormResponse>, ApiError> {
    let user = state.user_service.reset_target(&token).await?;
    Ok(Json(ResetFormResponse { email: user.email }))
}

/// POST /api/v1/security/reset/{token}
async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(body): Json<NewPasswordRequest>,
) -> Result<Response, ApiError> {
    state
        .user_service
        .reset_password(&token, &body.password)
        .await?;
    Ok(flash_to_login(
        &state,
        FlashMessage::success("Password changed. Sign in with the new one"),
    ))
}
