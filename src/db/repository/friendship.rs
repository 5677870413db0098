use chrono::Utc;
use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::db::models::{Friendship, FriendshipStatus};
use crate::error::{AppError, AppResult};

// ============================================================================
// Friendship Repository
// ============================================================================

pub struct FriendshipRepository;

impl FriendshipRepository {
    /// Insert a new PENDING request from `user_id` to `friend_id`.
    ///
    /// The unordered-pair unique index rejects a second row for the same two
    /// users regardless of direction.
    pub async fn create<'c, E>(executor: E, user_id: &str, friend_id: &str) -> AppResult<Friendship>
    where
        E: SqliteExecutor<'c>,
    {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, Friendship>(
            r#"
            INSERT INTO friendships (id, user_id, friend_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, user_id, friend_id, status, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(friend_id)
        .bind(FriendshipStatus::Pending)
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Find a friendship by id, only if `user_id` is one of its participants.
    pub async fn find_visible<'c, E>(
        executor: E,
        id: &str,
        user_id: &str,
    ) -> AppResult<Option<Friendship>>
    where
        E: SqliteExecutor<'c>,
    {
        sqlx::query_as::<_, Friendship>(
            r#"
            SELECT id, user_id, friend_id, status, created_at, updated_at
            FROM friendships
            WHERE id = ? AND (user_id = ? OR friend_id = ?)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Symmetric lookup: the single record linking the two users, whoever sent it.
    pub async fn find_between<'c, E>(
        executor: E,
        user_a: &str,
        user_b: &str,
    ) -> AppResult<Option<Friendship>>
    where
        E: SqliteExecutor<'c>,
    {
        sqlx::query_as::<_, Friendship>(
            r#"
            SELECT id, user_id, friend_id, status, created_at, updated_at
            FROM friendships
            WHERE (user_id = ? AND friend_id = ?)
               OR (user_id = ? AND friend_id = ?)
            LIMIT 1
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(user_b)
        .bind(user_a)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)
    }

    /// All friendships the user takes part in, oldest first.
    pub async fn list_for_user<'c, E>(
        executor: E,
        user_id: &str,
        status: Option<FriendshipStatus>,
    ) -> AppResult<Vec<Friendship>>
    where
        E: SqliteExecutor<'c>,
    {
        sqlx::query_as::<_, Friendship>(
            r#"
            SELECT id, user_id, friend_id, status, created_at, updated_at
            FROM friendships
            WHERE (user_id = ? OR friend_id = ?)
              AND (? IS NULL OR status = ?)
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(status)
        .bind(status)
        .fetch_all(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Set the status, but only on a record where `recipient_id` is the
    /// `friend_id` side. `None` when no such record exists.
    pub async fn update_status<'c, E>(
        executor: E,
        id: &str,
        recipient_id: &str,
        status: FriendshipStatus,
    ) -> AppResult<Option<Friendship>>
    where
        E: SqliteExecutor<'c>,
    {
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, Friendship>(
            r#"
            UPDATE friendships
            SET status = ?, updated_at = ?
            WHERE id = ? AND friend_id = ?
            RETURNING id, user_id, friend_id, status, created_at, updated_at
            "#,
        )
        .bind(status)
        .bind(now)
        .bind(id)
        .bind(recipient_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Delete a record `user_id` takes part in. Returns true when a row was removed.
    pub async fn delete<'c, E>(executor: E, id: &str, user_id: &str) -> AppResult<bool>
    where
        E: SqliteExecutor<'c>,
    {
        let result =
            sqlx::query("DELETE FROM friendships WHERE id = ? AND (user_id = ? OR friend_id = ?)")
                .bind(id)
                .bind(user_id)
                .bind(user_id)
                .execute(executor)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
