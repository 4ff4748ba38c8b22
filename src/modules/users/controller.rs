use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use campus_core::{AppError, PaginationParams};
use campus_models::{
    CreateUserDto, MessageResponse, PaginatedUsersResponse, UpdateUserDto, User, UserDetail,
    UserId, UserSearchParams,
};

use crate::middleware::auth::AuthUser;
use crate::modules::users::service::UserService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/users",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated list of users", body = PaginatedUsersResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - administrators only")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_users(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedUsersResponse>, AppError> {
    let users =
        UserService::list_users(&state.db, &state.cipher, auth_user.user_id(), params).await?;
    Ok(Json(users))
}

/// Case-insensitive substring search over names and emails.
#[utoipa::path(
    get,
    path = "/api/users/search",
    params(UserSearchParams),
    responses(
        (status = 200, description = "Matching users", body = Vec<User>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - administrators only")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, params))]
pub async fn search_users(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<UserSearchParams>,
) -> Result<Json<Vec<User>>, AppError> {
    let users =
        UserService::search_users(&state.db, &state.cipher, auth_user.user_id(), &params.query)
            .await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(
        ("id" = UserId, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = UserDetail),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<UserId>,
) -> Result<Json<UserDetail>, AppError> {
    let user = UserService::get_user(&state.db, &state.cipher, auth_user.user_id(), id).await?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserDto,
    responses(
        (status = 200, description = "User created", body = User),
        (status = 400, description = "Invalid input, weak password or unsupported role"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - administrators only"),
        (status = 409, description = "Email already in use")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateUserDto>,
) -> Result<Json<User>, AppError> {
    let user = UserService::create_user(
        &state.db,
        &state.cipher,
        &state.password_policy,
        auth_user.user_id(),
        dto,
    )
    .await?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(
        ("id" = UserId, Path, description = "User ID")
    ),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid input or weak password"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already in use")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<UserId>,
    ValidatedJson(dto): ValidatedJson<UpdateUserDto>,
) -> Result<Json<User>, AppError> {
    let user = UserService::update_user(
        &state.db,
        &state.cipher,
        &state.password_policy,
        auth_user.user_id(),
        id,
        dto,
    )
    .await?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(
        ("id" = UserId, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - administrators only"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User still owns courses")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<UserId>,
) -> Result<Json<MessageResponse>, AppError> {
    UserService::delete_user(&state.db, auth_user.user_id(), id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}
