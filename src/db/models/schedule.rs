use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// Schedule Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub is_all_day: bool,
    pub location: Option<String>,
    pub color: Option<String>,
    pub is_recurring: bool,
    pub recurrence_rule: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSchedule {
    pub title: String,
    pub description: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    #[serde(default)]
    pub is_all_day: bool,
    pub location: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurrence_rule: Option<String>,
}

/// Partial update: absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSchedule {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub is_all_day: Option<bool>,
    pub location: Option<String>,
    pub color: Option<String>,
    pub is_recurring: Option<bool>,
    pub recurrence_rule: Option<String>,
}

impl UpdateSchedule {
    /// Apply the present fields on top of a stored schedule.
    pub fn merge_into(self, current: &Schedule) -> CreateSchedule {
        CreateSchedule {
            title: self.title.unwrap_or_else(|| current.title.clone()),
            description: self.description.or_else(|| current.description.clone()),
            start_time: self.start_time.unwrap_or(current.start_time),
            end_time: self.end_time.unwrap_or(current.end_time),
            is_all_day: self.is_all_day.unwrap_or(current.is_all_day),
            location: self.location.or_else(|| current.location.clone()),
            color: self.color.or_else(|| current.color.clone()),
            is_recurring: self.is_recurring.unwrap_or(current.is_recurring),
            recurrence_rule: self
                .recurrence_rule
                .or_else(|| current.recurrence_rule.clone()),
        }
    }
}

/// Filters for listing a user's own schedules.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleFilter {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

fn default_limit() -> i64 {
    100
}

impl Default for ScheduleFilter {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
            start_date: None,
            end_date: None,
        }
    }
}
