//! RBAC business logic.
//!
//! Association tables are the only authorization state: a (user, role) or
//! (user, permission) pair is either present or absent, and transitions
//! only through the operations here. Each mutation runs inside a single
//! transaction so a role or permission cannot be deleted between its
//! lookup-by-name and the association write.

use anyhow::anyhow;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;
use uuid::Uuid;

use crate::utils::errors::AppError;

use super::model::{Permission, Role};

pub async fn role_by_name(conn: &mut PgConnection, name: &str) -> Result<Role, AppError> {
    sqlx::query_as::<_, Role>("SELECT id, name, created_at, updated_at FROM roles WHERE name = $1")
        .bind(name)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Role '{}' does not exist", name)))
}

pub async fn permission_by_name(
    conn: &mut PgConnection,
    name: &str,
) -> Result<Permission, AppError> {
    sqlx::query_as::<_, Permission>(
        "SELECT id, name, created_at, updated_at FROM permissions WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("Permission '{}' does not exist", name)))
}

async fn ensure_user_exists(conn: &mut PgConnection, user_id: Uuid) -> Result<(), AppError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(conn)
        .await?;

    if !exists {
        return Err(AppError::not_found(anyhow!(
            "User with id {} not found",
            user_id
        )));
    }

    Ok(())
}

/// Add a (user, role) association. Assigning a role the user already holds
/// is a silent no-op.
#[instrument(skip(db))]
pub async fn assign_role(db: &PgPool, user_id: Uuid, role_name: &str) -> Result<(), AppError> {
    let mut tx = db.begin().await?;

    ensure_user_exists(&mut tx, user_id).await?;
    let role = role_by_name(&mut tx, role_name).await?;

    sqlx::query(
        r#"INSERT INTO user_roles (user_id, role_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, role_id) DO NOTHING"#,
    )
    .bind(user_id)
    .bind(role.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(())
}

/// Remove a (user, role) association. Removing a role the user does not
/// hold (including an unknown role name) rejects with 400 `Error`.
#[instrument(skip(db))]
pub async fn remove_role(db: &PgPool, user_id: Uuid, role_name: &str) -> Result<(), AppError> {
    let mut tx = db.begin().await?;

    ensure_user_exists(&mut tx, user_id).await?;

    let role = sqlx::query_as::<_, Role>(
        "SELECT id, name, created_at, updated_at FROM roles WHERE name = $1",
    )
    .bind(role_name)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(AppError::invalid_state)?;

    let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
        .bind(user_id)
        .bind(role.id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::invalid_state());
    }

    tx.commit().await?;

    Ok(())
}

/// Grant a permission directly to a user, independent of any role. A
/// duplicate grant is a silent no-op.
#[instrument(skip(db))]
pub async fn give_permission(
    db: &PgPool,
    user_id: Uuid,
    permission_name: &str,
) -> Result<(), AppError> {
    let mut tx = db.begin().await?;

    ensure_user_exists(&mut tx, user_id).await?;
    let permission = permission_by_name(&mut tx, permission_name).await?;

    sqlx::query(
        r#"INSERT INTO user_permissions (user_id, permission_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, permission_id) DO NOTHING"#,
    )
    .bind(user_id)
    .bind(permission.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(())
}

/// Revoke a user's *direct* grant of a permission.
///
/// The guard checks the effective set: if the user holds the permission
/// neither directly nor through a role, this rejects with 400 `Error`.
/// When the permission is also conferred by a held role, only the direct
/// row is removed and the capability survives via the role.
#[instrument(skip(db))]
pub async fn revoke_permission(
    db: &PgPool,
    user_id: Uuid,
    permission_name: &str,
) -> Result<(), AppError> {
    let mut tx = db.begin().await?;

    ensure_user_exists(&mut tx, user_id).await?;

    let permission = sqlx::query_as::<_, Permission>(
        "SELECT id, name, created_at, updated_at FROM permissions WHERE name = $1",
    )
    .bind(permission_name)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(AppError::invalid_state)?;

    if !has_permission(&mut tx, user_id, permission_name).await? {
        return Err(AppError::invalid_state());
    }

    sqlx::query("DELETE FROM user_permissions WHERE user_id = $1 AND permission_id = $2")
        .bind(user_id)
        .bind(permission.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}

/// Effective-set membership: direct grants union role-derived permissions.
async fn has_permission(
    conn: &mut PgConnection,
    user_id: Uuid,
    permission_name: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query_scalar::<_, bool>(
        r#"SELECT EXISTS(
            SELECT 1 FROM user_permissions up
            INNER JOIN permissions p ON up.permission_id = p.id
            WHERE up.user_id = $1 AND p.name = $2
            UNION
            SELECT 1 FROM user_roles ur
            INNER JOIN role_permissions rp ON ur.role_id = rp.role_id
            INNER JOIN permissions p ON rp.permission_id = p.id
            WHERE ur.user_id = $1 AND p.name = $2
        )"#,
    )
    .bind(user_id)
    .bind(permission_name)
    .fetch_one(conn)
    .await?;

    Ok(result)
}

/// Pool-facing wrapper around the effective-permission check.
#[instrument(skip(db))]
pub async fn user_has_permission(
    db: &PgPool,
    user_id: Uuid,
    permission_name: &str,
) -> Result<bool, AppError> {
    let mut conn = db.acquire().await?;
    has_permission(&mut conn, user_id, permission_name).await
}

#[instrument(skip(db))]
pub async fn get_user_role_names(db: &PgPool, user_id: Uuid) -> Result<Vec<String>, AppError> {
    let names = sqlx::query_scalar::<_, String>(
        r#"SELECT r.name
        FROM roles r
        INNER JOIN user_roles ur ON r.id = ur.role_id
        WHERE ur.user_id = $1
        ORDER BY r.name"#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(names)
}

/// Names of the user's directly granted permissions (role-derived
/// permissions are not included).
#[instrument(skip(db))]
pub async fn get_user_permission_names(
    db: &PgPool,
    user_id: Uuid,
) -> Result<Vec<String>, AppError> {
    let names = sqlx::query_scalar::<_, String>(
        r#"SELECT p.name
        FROM permissions p
        INNER JOIN user_permissions up ON p.id = up.permission_id
        WHERE up.user_id = $1
        ORDER BY p.name"#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(names)
}
