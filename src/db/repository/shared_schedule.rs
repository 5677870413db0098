use chrono::Utc;
use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::db::models::{PermissionLevel, Schedule, SharedSchedule};
use crate::error::{AppError, AppResult};

// ============================================================================
// Shared Schedule Repository
// ============================================================================

pub struct SharedScheduleRepository;

impl SharedScheduleRepository {
    /// Create a share (owner grants `shared_with_id` access to one schedule).
    pub async fn create<'c, E>(
        executor: E,
        owner_id: &str,
        shared_with_id: &str,
        schedule_id: &str,
        permission_level: PermissionLevel,
    ) -> AppResult<SharedSchedule>
    where
        E: SqliteExecutor<'c>,
    {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, SharedSchedule>(
            r#"
            INSERT INTO shared_schedules (
                id, user_id, shared_with_id, schedule_id, permission_level, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, user_id, shared_with_id, schedule_id, permission_level, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(owner_id)
        .bind(shared_with_id)
        .bind(schedule_id)
        .bind(permission_level)
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Find a share by id if `user_id` is its owner or its target.
    pub async fn find_visible<'c, E>(
        executor: E,
        id: &str,
        user_id: &str,
    ) -> AppResult<Option<SharedSchedule>>
    where
        E: SqliteExecutor<'c>,
    {
        sqlx::query_as::<_, SharedSchedule>(
            r#"
            SELECT id, user_id, shared_with_id, schedule_id, permission_level, created_at, updated_at
            FROM shared_schedules
            WHERE id = ? AND (user_id = ? OR shared_with_id = ?)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Find the share for an exact (owner, target, schedule) triple.
    pub async fn find_by_triple<'c, E>(
        executor: E,
        owner_id: &str,
        shared_with_id: &str,
        schedule_id: &str,
    ) -> AppResult<Option<SharedSchedule>>
    where
        E: SqliteExecutor<'c>,
    {
        sqlx::query_as::<_, SharedSchedule>(
            r#"
            SELECT id, user_id, shared_with_id, schedule_id, permission_level, created_at, updated_at
            FROM shared_schedules
            WHERE user_id = ? AND shared_with_id = ? AND schedule_id = ?
            LIMIT 1
            "#,
        )
        .bind(owner_id)
        .bind(shared_with_id)
        .bind(schedule_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)
    }

    pub async fn list_by_owner<'c, E>(executor: E, owner_id: &str) -> AppResult<Vec<SharedSchedule>>
    where
        E: SqliteExecutor<'c>,
    {
        sqlx::query_as::<_, SharedSchedule>(
            r#"
            SELECT id, user_id, shared_with_id, schedule_id, permission_level, created_at, updated_at
            FROM shared_schedules
            WHERE user_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(executor)
        .await
        .map_err(AppError::Database)
    }

    pub async fn list_by_recipient<'c, E>(
        executor: E,
        shared_with_id: &str,
    ) -> AppResult<Vec<SharedSchedule>>
    where
        E: SqliteExecutor<'c>,
    {
        sqlx::query_as::<_, SharedSchedule>(
            r#"
            SELECT id, user_id, shared_with_id, schedule_id, permission_level, created_at, updated_at
            FROM shared_schedules
            WHERE shared_with_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(shared_with_id)
        .fetch_all(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Full schedule rows for every share targeting `shared_with_id`.
    pub async fn list_schedules_shared_with<'c, E>(
        executor: E,
        shared_with_id: &str,
    ) -> AppResult<Vec<Schedule>>
    where
        E: SqliteExecutor<'c>,
    {
        sqlx::query_as::<_, Schedule>(
            r#"
            SELECT
                s.id, s.user_id, s.title, s.description, s.start_time, s.end_time,
                s.is_all_day, s.location, s.color, s.is_recurring, s.recurrence_rule,
                s.created_at, s.updated_at
            FROM schedules s
            JOIN shared_schedules sh ON sh.schedule_id = s.id
            WHERE sh.shared_with_id = ?
            ORDER BY s.start_time ASC, sh.rowid ASC
            "#,
        )
        .bind(shared_with_id)
        .fetch_all(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Change the level of a share owned by `owner_id`. `None` otherwise.
    pub async fn update_permission<'c, E>(
        executor: E,
        id: &str,
        owner_id: &str,
        permission_level: PermissionLevel,
    ) -> AppResult<Option<SharedSchedule>>
    where
        E: SqliteExecutor<'c>,
    {
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, SharedSchedule>(
            r#"
            UPDATE shared_schedules
            SET permission_level = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING id, user_id, shared_with_id, schedule_id, permission_level, created_at, updated_at
            "#,
        )
        .bind(permission_level)
        .bind(now)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Delete a share owned by `owner_id`. Returns true when a row was removed.
    pub async fn delete<'c, E>(executor: E, id: &str, owner_id: &str) -> AppResult<bool>
    where
        E: SqliteExecutor<'c>,
    {
        let result = sqlx::query("DELETE FROM shared_schedules WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
