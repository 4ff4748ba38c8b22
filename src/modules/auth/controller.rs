use axum::{Json, extract::State};
use tracing::instrument;
use utoipa::ToSchema;

use campus_core::AppError;
use campus_models::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest, User,
    UserDetail,
};

use super::service::AuthService;
use crate::middleware::auth::{AuthUser, OptionalAuthUser};
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[derive(ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Register a new user
///
/// Students may self-register. Any other role requires an administrator token.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = User),
        (status = 400, description = "Validation error or weak password", body = ErrorResponse),
        (status = 403, description = "Role requires an administrator", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse)
    ),
    tag = "Authentication",
    security((), ("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn register_user(
    State(state): State<AppState>,
    auth_user: OptionalAuthUser,
    ValidatedJson(dto): ValidatedJson<RegisterRequest>,
) -> Result<Json<User>, AppError> {
    let user = AuthService::register_user(
        &state.db,
        &state.cipher,
        &state.password_policy,
        auth_user.user_id(),
        dto,
    )
    .await?;
    Ok(Json(user))
}

/// Login and receive an access token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn login_user(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response =
        AuthService::login_user(&state.db, &state.cipher, &state.jwt_config, dto).await?;
    Ok(Json(response))
}

/// Current user from the access token
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses(
        (status = 200, description = "User profile", body = UserDetail),
        (status = 401, description = "Missing, expired or stale token", body = ErrorResponse),
        (status = 422, description = "Malformed token", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserDetail>, AppError> {
    let user = AuthService::get_profile(&state.db, &state.cipher, auth_user.user_id()).await?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "New password violates the policy", body = ErrorResponse),
        (status = 401, description = "Old password incorrect", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    AuthService::change_password(&state.db, &state.password_policy, auth_user.user_id(), dto)
        .await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}
