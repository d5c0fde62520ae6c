use anyhow::anyhow;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::modules::authz;
use crate::utils::errors::AppError;
use crate::utils::password::hash_password;

use super::model::{CreateUserDto, DEFAULT_ROLE, UpdateUserDto, User, UserWithAccess};

fn map_unique_email(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::conflict(anyhow!("A user with this email already exists"));
        }
    }
    AppError::from(e)
}

pub struct UserService;

impl UserService {
    /// Create a user and assign the default role in one transaction.
    ///
    /// The default-role assignment is an explicit step here rather than a
    /// storage-side hook, keeping the "every user holds at least one role"
    /// invariant in one auditable place.
    #[instrument(skip(db, dto))]
    pub async fn create_user(db: &PgPool, dto: CreateUserDto) -> Result<UserWithAccess, AppError> {
        // Lowercased so the UNIQUE constraint is case-insensitive.
        let email = dto.email.to_lowercase();
        let hashed = hash_password(&dto.password)?;

        let mut tx = db.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (name, email, password)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, created_at, updated_at"#,
        )
        .bind(&dto.name)
        .bind(&email)
        .bind(&hashed)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_email)?;

        let role = authz::service::role_by_name(&mut tx, DEFAULT_ROLE).await?;

        sqlx::query(
            r#"INSERT INTO user_roles (user_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role_id) DO NOTHING"#,
        )
        .bind(user.id)
        .bind(role.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Self::with_access(db, user).await
    }

    #[instrument(skip(db))]
    pub async fn get_users(db: &PgPool) -> Result<Vec<UserWithAccess>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, name, email, created_at, updated_at FROM users ORDER BY created_at",
        )
        .fetch_all(db)
        .await?;

        let mut result = Vec::with_capacity(users.len());
        for user in users {
            result.push(Self::with_access(db, user).await?);
        }

        Ok(result)
    }

    #[instrument(skip(db))]
    pub async fn get_user(db: &PgPool, id: Uuid) -> Result<UserWithAccess, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("User with id {} not found", id)))?;

        Self::with_access(db, user).await
    }

    /// Apply only the supplied fields; absent fields stay untouched.
    /// The read and the write share one transaction so a concurrent
    /// delete surfaces as NotFound rather than a vanished row.
    #[instrument(skip(db, dto))]
    pub async fn update_user(
        db: &PgPool,
        id: Uuid,
        dto: UpdateUserDto,
    ) -> Result<UserWithAccess, AppError> {
        let mut tx = db.begin().await?;

        let existing = sqlx::query_as::<_, User>(
            "SELECT id, name, email, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("User with id {} not found", id)))?;

        if dto.name.is_none() && dto.email.is_none() && dto.password.is_none() {
            // Nothing to change; leave updated_at alone.
            tx.rollback().await?;
            return Self::with_access(db, existing).await;
        }

        let name = dto.name.unwrap_or(existing.name);
        let email = dto
            .email
            .map(|e| e.to_lowercase())
            .unwrap_or(existing.email);

        let user = if let Some(password) = dto.password {
            let hashed = hash_password(&password)?;
            sqlx::query_as::<_, User>(
                r#"UPDATE users SET name = $1, email = $2, password = $3, updated_at = NOW()
                WHERE id = $4
                RETURNING id, name, email, created_at, updated_at"#,
            )
            .bind(&name)
            .bind(&email)
            .bind(&hashed)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_unique_email)?
        } else {
            sqlx::query_as::<_, User>(
                r#"UPDATE users SET name = $1, email = $2, updated_at = NOW()
                WHERE id = $3
                RETURNING id, name, email, created_at, updated_at"#,
            )
            .bind(&name)
            .bind(&email)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_unique_email)?
        };

        tx.commit().await?;

        Self::with_access(db, user).await
    }

    /// Delete a user. Association rows cascade; shared roles and
    /// permissions stay. A second delete reports NotFound.
    #[instrument(skip(db))]
    pub async fn delete_user(db: &PgPool, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!(
                "User with id {} not found",
                id
            )));
        }

        Ok(())
    }

    async fn with_access(db: &PgPool, user: User) -> Result<UserWithAccess, AppError> {
        let roles = authz::service::get_user_role_names(db, user.id).await?;
        let permissions = authz::service::get_user_permission_names(db, user.id).await?;

        Ok(UserWithAccess {
            user,
            roles,
            permissions,
        })
    }
}
