// HTTP handlers for the caller's own profile

use axum::{extract::State, Json};
use validator::Validate;

use crate::auth::{
    middleware::CurrentUser,
    models::{MessageResponse, ProfileUpdate, UserResponse},
};
use crate::error::{ApiError, ErrorResponse};
use crate::AppState;

/// Handler for GET /api/users/profile
#[utoipa::path(
    get,
    path = "/api/users/profile",
    responses(
        (status = 200, description = "Profile of the caller", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_profile_handler(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth.get_current_user(identity.user_id).await?;
    Ok(Json(user))
}

/// Handler for PUT /api/users/profile
/// Only the fields present in the body are changed
#[utoipa::path(
    put,
    path = "/api/users/profile",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_profile_handler(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    update.validate()?;

    let user = state
        .users
        .update_profile(identity.user_id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("User", identity.user_id))?;

    tracing::info!("User {} updated profile", identity.user_id);
    Ok(Json(UserResponse::from(user)))
}

/// Handler for DELETE /api/users/account
/// Deactivates the account; existing tokens stop working immediately
#[utoipa::path(
    delete,
    path = "/api/users/account",
    responses(
        (status = 200, description = "Account deactivated", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn deactivate_account_handler(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.deactivate_account(identity.user_id).await?;
    Ok(Json(MessageResponse::new("Account deactivated")))
}
