use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::authz::model::{AssignRoleDto, GivePermissionDto};
use crate::modules::authz::service;
use crate::modules::users::model::MessageResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::validator::ValidatedJson;

/// Assign a role to a user by role name
#[utoipa::path(
    post,
    path = "/api/users/{id}/assign-role",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = AssignRoleDto,
    responses(
        (status = 200, description = "Role assigned (no-op if already held)", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = MessageResponse),
        (status = 404, description = "User or role not found", body = MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Access control"
)]
#[instrument(skip(state))]
pub async fn assign_role(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<AssignRoleDto>,
) -> Result<Json<MessageResponse>, AppError> {
    service::assign_role(&state.db, id, &dto.role).await?;
    Ok(Json(MessageResponse {
        message: "Role assigned".to_string(),
    }))
}

/// Remove a role from a user
#[utoipa::path(
    delete,
    path = "/api/users/{id}/remove-role/{role}",
    params(
        ("id" = Uuid, Path, description = "User id"),
        ("role" = String, Path, description = "Role name")
    ),
    responses(
        (status = 200, description = "Role removed", body = MessageResponse),
        (status = 400, description = "User does not hold this role", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Access control"
)]
#[instrument(skip(state))]
pub async fn remove_role(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path((id, role)): Path<(Uuid, String)>,
) -> Result<Json<MessageResponse>, AppError> {
    service::remove_role(&state.db, id, &role).await?;
    Ok(Json(MessageResponse {
        message: "Deleted".to_string(),
    }))
}

/// Grant a permission directly to a user by permission name
#[utoipa::path(
    post,
    path = "/api/users/{id}/give-permission",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = GivePermissionDto,
    responses(
        (status = 200, description = "Permission granted (no-op if already held)", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = MessageResponse),
        (status = 404, description = "User or permission not found", body = MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Access control"
)]
#[instrument(skip(state))]
pub async fn give_permission(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<GivePermissionDto>,
) -> Result<Json<MessageResponse>, AppError> {
    service::give_permission(&state.db, id, &dto.permission).await?;
    Ok(Json(MessageResponse {
        message: "Permission granted".to_string(),
    }))
}

/// Revoke a user's direct permission grant
#[utoipa::path(
    delete,
    path = "/api/users/{id}/revoke-permission-to/{permission}",
    params(
        ("id" = Uuid, Path, description = "User id"),
        ("permission" = String, Path, description = "Permission name")
    ),
    responses(
        (status = 200, description = "Direct grant removed", body = MessageResponse),
        (status = 400, description = "User does not hold this permission", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Access control"
)]
#[instrument(skip(state))]
pub async fn revoke_permission(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path((id, permission)): Path<(Uuid, String)>,
) -> Result<Json<MessageResponse>, AppError> {
    service::revoke_permission(&state.db, id, &permission).await?;
    Ok(Json(MessageResponse {
        message: "Deleted".to_string(),
    }))
}
