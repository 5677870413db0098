use std::sync::Arc;

use crate::db::{CreateSchedule, Schedule, ScheduleFilter, ScheduleRepository, UpdateSchedule};
use crate::error::{AppError, AppResult};
use crate::i18n::t;
use crate::AppState;

const TITLE_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 500;
const LOCATION_MAX: usize = 200;
const RECURRENCE_RULE_MAX: usize = 100;

/// Owner-only schedule CRUD. Someone else's schedule is reported as absent.
pub struct ScheduleService;

impl ScheduleService {
    pub async fn list(
        state: &Arc<AppState>,
        user_id: &str,
        filter: &ScheduleFilter,
    ) -> AppResult<Vec<Schedule>> {
        if filter.skip < 0 || filter.limit < 0 {
            return Err(AppError::Validation(t("validation.pagination")));
        }
        ScheduleRepository::list_for_user(&state.db, user_id, filter).await
    }

    pub async fn get(
        state: &Arc<AppState>,
        schedule_id: &str,
        user_id: &str,
    ) -> AppResult<Option<Schedule>> {
        ScheduleRepository::find_owned(&state.db, schedule_id, user_id).await
    }

    pub async fn create(
        state: &Arc<AppState>,
        user_id: &str,
        input: CreateSchedule,
    ) -> AppResult<Schedule> {
        let input = normalize(input);
        validate(&input)?;

        let schedule = ScheduleRepository::create(&state.db, user_id, &input).await?;
        tracing::info!("User {} created schedule {}", user_id, schedule.id);
        Ok(schedule)
    }

    /// Partial update; the merged result is validated as a whole.
    pub async fn update(
        state: &Arc<AppState>,
        schedule_id: &str,
        user_id: &str,
        changes: UpdateSchedule,
    ) -> AppResult<Option<Schedule>> {
        let Some(current) = ScheduleRepository::find_owned(&state.db, schedule_id, user_id).await?
        else {
            return Ok(None);
        };

        let merged = normalize(changes.merge_into(&current));
        validate(&merged)?;

        let updated = ScheduleRepository::update(&state.db, schedule_id, user_id, &merged).await?;
        if updated.is_some() {
            tracing::info!("User {} updated schedule {}", user_id, schedule_id);
        }
        Ok(updated)
    }

    /// Deleting a schedule also drops every share of it.
    pub async fn delete(state: &Arc<AppState>, schedule_id: &str, user_id: &str) -> AppResult<bool> {
        let deleted = ScheduleRepository::delete(&state.db, schedule_id, user_id).await?;
        if deleted {
            tracing::info!("User {} deleted schedule {}", user_id, schedule_id);
        }
        Ok(deleted)
    }
}

/// Trim text fields and turn blank optionals into `None`.
fn normalize(mut input: CreateSchedule) -> CreateSchedule {
    fn blank_to_none(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    input.title = input.title.trim().to_string();
    input.description = blank_to_none(input.description);
    input.location = blank_to_none(input.location);
    input.color = blank_to_none(input.color);
    input.recurrence_rule = blank_to_none(input.recurrence_rule);
    input
}

fn validate(input: &CreateSchedule) -> AppResult<()> {
    let title_len = input.title.chars().count();
    if title_len == 0 || title_len > TITLE_MAX {
        return Err(AppError::Validation(t("validation.title")));
    }

    if exceeds(&input.description, DESCRIPTION_MAX) {
        return Err(AppError::Validation(t("validation.description")));
    }

    if exceeds(&input.location, LOCATION_MAX) {
        return Err(AppError::Validation(t("validation.location")));
    }

    if let Some(color) = &input.color {
        if !is_hex_color(color) {
            return Err(AppError::Validation(t("validation.color")));
        }
    }

    if input.end_time < input.start_time {
        return Err(AppError::Validation(t("validation.end_before_start")));
    }

    if input.recurrence_rule.is_some() && !input.is_recurring {
        return Err(AppError::Validation(t("validation.recurrence_rule")));
    }

    if exceeds(&input.recurrence_rule, RECURRENCE_RULE_MAX) {
        return Err(AppError::Validation(t("validation.recurrence_rule_length")));
    }

    Ok(())
}

fn exceeds(value: &Option<String>, max: usize) -> bool {
    value.as_ref().is_some_and(|v| v.chars().count() > max)
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}
