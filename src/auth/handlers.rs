// HTTP handlers for authentication endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::auth::{
    middleware::CurrentUser,
    models::{
        AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse, RefreshRequest,
        RefreshResponse, RegisterRequest, UserResponse,
    },
};
use crate::error::{ApiError, ErrorResponse};
use crate::AppState;

/// Pull a non-empty refresh token out of the request body
fn required_refresh_token(request: RefreshRequest) -> Result<String, ApiError> {
    request
        .refresh_token
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| {
            ApiError::invalid_field("refresh_token", "required", "Refresh token is required")
        })
}

/// Register a new user
/// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Invalid input or email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    tracing::debug!("Registration request for {}", request.email);
    let response = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login a user
/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Invalid credentials or deactivated account", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let response = state.auth.login(request).await?;
    Ok(Json(response))
}

/// Exchange a refresh token for a new access token
/// POST /api/auth/refresh
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token issued", body = RefreshResponse),
        (status = 400, description = "Refresh token missing", body = ErrorResponse),
        (status = 401, description = "Invalid, expired or revoked refresh token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let token = required_refresh_token(request)?;
    let response = state.auth.refresh(&token).await?;
    Ok(Json(response))
}

/// Revoke a single refresh token
/// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 400, description = "Refresh token missing", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn logout_handler(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = required_refresh_token(request)?;
    state.auth.logout(&token).await?;
    Ok(Json(MessageResponse::new("Logged out")))
}

/// Revoke every refresh token of the caller
/// POST /api/auth/logout-all
#[utoipa::path(
    post,
    path = "/api/auth/logout-all",
    responses(
        (status = 200, description = "All sessions revoked", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout_all_handler(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.logout_all(identity.user_id).await?;
    Ok(Json(MessageResponse::new("Logged out of all sessions")))
}

/// Get current user information
/// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me_handler(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth.get_current_user(identity.user_id).await?;
    Ok(Json(user))
}

/// Change the caller's password; revokes every session
/// PUT /api/auth/password
#[utoipa::path(
    put,
    path = "/api/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated or wrong current password", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn change_password_handler(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.change_password(identity.user_id, request).await?;
    Ok(Json(MessageResponse::new(
        "Password changed; please log in again",
    )))
}
