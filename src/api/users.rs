//! User management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::user::{UpdateRole, UpdateUser, User, UserQuery, UserShort},
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List users with search and pagination
#[utoipa::path(
    get,
    path = "/user",
    tag = "users",
    security(("bearer_auth" = [])),
    params(UserQuery),
    responses(
        (status = 200, description = "List of users", body = PaginatedResponse<UserShort>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<PaginatedResponse<UserShort>>> {
    claims.require_staff()?;

    let (users, total) = state.services.users.search_users(&query).await?;

    Ok(Json(PaginatedResponse {
        items: users,
        total,
        page: query.page.unwrap_or(1).max(1),
        per_page: query.per_page.unwrap_or(20).clamp(1, 100),
    }))
}

/// Get user details by ID
#[utoipa::path(
    get,
    path = "/user/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<User>> {
    claims.require_self_or_staff(id)?;

    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(user))
}

/// Update a user profile (self or admin)
#[utoipa::path(
    put,
    path = "/user/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Wrong current password"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(user): Json<UpdateUser>,
) -> AppResult<Json<User>> {
    let updated = state.services.users.update_user(&claims, id, user).await?;
    Ok(Json(updated))
}

/// Change a user's role (admin only)
#[utoipa::path(
    put,
    path = "/user/{id}/role",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateRole,
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 403, description = "Admin privileges required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_role(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(update): Json<UpdateRole>,
) -> AppResult<Json<User>> {
    claims.require_admin()?;

    let updated = state.services.users.update_role(id, update).await?;
    Ok(Json(updated))
}

/// Delete a user (blocked instead when rentals exist)
#[utoipa::path(
    delete,
    path = "/user/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted or blocked"),
        (status = 403, description = "Admin privileges required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.users.delete_user(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
