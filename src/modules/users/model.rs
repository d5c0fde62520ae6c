//! User data models and DTOs.
//!
//! The [`User`] entity deliberately carries no password field: the bcrypt
//! hash is written on insert and never read back into a response type, so
//! it cannot leak through serialization.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A user account.
#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A user with resolved role names and directly granted permission names.
///
/// `permissions` lists direct grants only; permissions conferred through a
/// held role are reachable via the role and checked with
/// [`crate::modules::authz::service::user_has_permission`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct UserWithAccess {
    #[serde(flatten)]
    pub user: User,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

/// DTO for creating a new user.
#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
pub struct CreateUserDto {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// DTO for updating a user. Only supplied fields are applied.
#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
pub struct UpdateUserDto {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Name of the role every newly created user is assigned.
pub const DEFAULT_ROLE: &str = "user";
