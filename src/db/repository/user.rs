use chrono::Utc;
use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::db::models::{UpdateUser, User};
use crate::error::{AppError, AppResult};

// ============================================================================
// User Repository
// ============================================================================

pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_id<'c, E>(executor: E, id: &str) -> AppResult<Option<User>>
    where
        E: SqliteExecutor<'c>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT
                id, email, username, hashed_password,
                is_active, is_superuser,
                created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_email<'c, E>(executor: E, email: &str) -> AppResult<Option<User>>
    where
        E: SqliteExecutor<'c>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT
                id, email, username, hashed_password,
                is_active, is_superuser,
                created_at, updated_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_username<'c, E>(executor: E, username: &str) -> AppResult<Option<User>>
    where
        E: SqliteExecutor<'c>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT
                id, email, username, hashed_password,
                is_active, is_superuser,
                created_at, updated_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Look a user up by either login handle (email or username).
    pub async fn find_by_login<'c, E>(executor: E, login: &str) -> AppResult<Option<User>>
    where
        E: SqliteExecutor<'c>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT
                id, email, username, hashed_password,
                is_active, is_superuser,
                created_at, updated_at
            FROM users
            WHERE email = ? OR username = ?
            LIMIT 1
            "#,
        )
        .bind(login)
        .bind(login)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)
    }

    /// One page of users, oldest first.
    pub async fn list<'c, E>(executor: E, skip: i64, limit: i64) -> AppResult<Vec<User>>
    where
        E: SqliteExecutor<'c>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT
                id, email, username, hashed_password,
                is_active, is_superuser,
                created_at, updated_at
            FROM users
            ORDER BY created_at ASC, rowid ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(executor)
        .await
        .map_err(AppError::Database)
    }

    pub async fn count<'c, E>(executor: E) -> AppResult<i64>
    where
        E: SqliteExecutor<'c>,
    {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(executor)
            .await
            .map_err(AppError::Database)?;
        Ok(count)
    }

    pub async fn create<'c, E>(
        executor: E,
        email: &str,
        username: &str,
        hashed_password: &str,
        is_superuser: bool,
    ) -> AppResult<User>
    where
        E: SqliteExecutor<'c>,
    {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, email, username, hashed_password,
                is_active, is_superuser,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, 1, ?, ?, ?)
            RETURNING
                id, email, username, hashed_password,
                is_active, is_superuser,
                created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(email)
        .bind(username)
        .bind(hashed_password)
        .bind(is_superuser)
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Apply the present fields of `changes`. Returns `None` when the user is gone.
    pub async fn update<'c, E>(
        executor: E,
        id: &str,
        changes: &UpdateUser,
    ) -> AppResult<Option<User>>
    where
        E: SqliteExecutor<'c>,
    {
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET
                email = COALESCE(?, email),
                username = COALESCE(?, username),
                hashed_password = COALESCE(?, hashed_password),
                updated_at = ?
            WHERE id = ?
            RETURNING
                id, email, username, hashed_password,
                is_active, is_superuser,
                created_at, updated_at
            "#,
        )
        .bind(changes.email.as_deref())
        .bind(changes.username.as_deref())
        .bind(changes.hashed_password.as_deref())
        .bind(now)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Returns true when a row was removed. Schedules, friendships and shares cascade.
    pub async fn delete<'c, E>(executor: E, id: &str) -> AppResult<bool>
    where
        E: SqliteExecutor<'c>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
