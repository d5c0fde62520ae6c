//! Operator commands.
//!
//! `seed` is the one-time environment bootstrap: baseline roles and
//! permissions plus a single admin account. It is deliberately not
//! re-entrant: a second run hits the unique role/permission names and
//! fails with a conflict.

use sqlx::PgPool;
use uuid::Uuid;

use crate::utils::password::hash_password;

pub const BASELINE_ROLES: [&str; 2] = ["admin", "user"];
pub const BASELINE_PERMISSIONS: [&str; 4] =
    ["create user", "edit user", "delete user", "view user"];

/// Create baseline roles and permissions, grant every baseline permission
/// to the `admin` role, and create one admin account holding that role.
pub async fn seed(
    db: &PgPool,
    admin_name: &str,
    admin_email: &str,
    admin_password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let hashed_password = hash_password(admin_password)
        .map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let mut tx = db.begin().await?;

    let mut role_ids = Vec::with_capacity(BASELINE_ROLES.len());
    for role in BASELINE_ROLES {
        let id: Uuid = sqlx::query_scalar("INSERT INTO roles (name) VALUES ($1) RETURNING id")
            .bind(role)
            .fetch_one(&mut *tx)
            .await?;
        role_ids.push(id);
    }
    let admin_role_id = role_ids[0];

    for permission in BASELINE_PERMISSIONS {
        let permission_id: Uuid =
            sqlx::query_scalar("INSERT INTO permissions (name) VALUES ($1) RETURNING id")
                .bind(permission)
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)")
            .bind(admin_role_id)
            .bind(permission_id)
            .execute(&mut *tx)
            .await?;
    }

    let admin_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (name, email, password) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(admin_name)
    .bind(admin_email.to_lowercase())
    .bind(&hashed_password)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
        .bind(admin_id)
        .bind(admin_role_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}
