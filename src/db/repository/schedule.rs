use chrono::Utc;
use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::db::models::{CreateSchedule, Schedule, ScheduleFilter};
use crate::error::{AppError, AppResult};

// ============================================================================
// Schedule Repository
// ============================================================================

pub struct ScheduleRepository;

impl ScheduleRepository {
    pub async fn create<'c, E>(
        executor: E,
        user_id: &str,
        schedule: &CreateSchedule,
    ) -> AppResult<Schedule>
    where
        E: SqliteExecutor<'c>,
    {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, Schedule>(
            r#"
            INSERT INTO schedules (
                id, user_id, title, description, start_time, end_time,
                is_all_day, location, color, is_recurring, recurrence_rule,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING
                id, user_id, title, description, start_time, end_time,
                is_all_day, location, color, is_recurring, recurrence_rule,
                created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&schedule.title)
        .bind(schedule.description.as_deref())
        .bind(schedule.start_time)
        .bind(schedule.end_time)
        .bind(schedule.is_all_day)
        .bind(schedule.location.as_deref())
        .bind(schedule.color.as_deref())
        .bind(schedule.is_recurring)
        .bind(schedule.recurrence_rule.as_deref())
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Find a schedule only if it belongs to `user_id`.
    pub async fn find_owned<'c, E>(
        executor: E,
        id: &str,
        user_id: &str,
    ) -> AppResult<Option<Schedule>>
    where
        E: SqliteExecutor<'c>,
    {
        sqlx::query_as::<_, Schedule>(
            r#"
            SELECT
                id, user_id, title, description, start_time, end_time,
                is_all_day, location, color, is_recurring, recurrence_rule,
                created_at, updated_at
            FROM schedules
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)
    }

    /// The user's own schedules, ordered by start time, windowed by `filter`.
    pub async fn list_for_user<'c, E>(
        executor: E,
        user_id: &str,
        filter: &ScheduleFilter,
    ) -> AppResult<Vec<Schedule>>
    where
        E: SqliteExecutor<'c>,
    {
        sqlx::query_as::<_, Schedule>(
            r#"
            SELECT
                id, user_id, title, description, start_time, end_time,
                is_all_day, location, color, is_recurring, recurrence_rule,
                created_at, updated_at
            FROM schedules
            WHERE user_id = ?
              AND (? IS NULL OR start_time >= ?)
              AND (? IS NULL OR end_time <= ?)
            ORDER BY start_time ASC, rowid ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(filter.start_date)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.end_date)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Overwrite the editable fields of an owned schedule.
    pub async fn update<'c, E>(
        executor: E,
        id: &str,
        user_id: &str,
        schedule: &CreateSchedule,
    ) -> AppResult<Option<Schedule>>
    where
        E: SqliteExecutor<'c>,
    {
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, Schedule>(
            r#"
            UPDATE schedules
            SET
                title = ?, description = ?, start_time = ?, end_time = ?,
                is_all_day = ?, location = ?, color = ?,
                is_recurring = ?, recurrence_rule = ?,
                updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING
                id, user_id, title, description, start_time, end_time,
                is_all_day, location, color, is_recurring, recurrence_rule,
                created_at, updated_at
            "#,
        )
        .bind(&schedule.title)
        .bind(schedule.description.as_deref())
        .bind(schedule.start_time)
        .bind(schedule.end_time)
        .bind(schedule.is_all_day)
        .bind(schedule.location.as_deref())
        .bind(schedule.color.as_deref())
        .bind(schedule.is_recurring)
        .bind(schedule.recurrence_rule.as_deref())
        .bind(now)
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)
    }

    /// Returns true when an owned schedule was removed. Shares cascade.
    pub async fn delete<'c, E>(executor: E, id: &str, user_id: &str) -> AppResult<bool>
    where
        E: SqliteExecutor<'c>,
    {
        let result = sqlx::query("DELETE FROM schedules WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
