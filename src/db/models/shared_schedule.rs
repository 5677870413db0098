use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// Shared Schedule Models
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PermissionLevel {
    #[default]
    View,
    Edit,
}

impl PermissionLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionLevel::View => "view",
            PermissionLevel::Edit => "edit",
        }
    }
}

/// A grant from the schedule owner (`user_id`) to a friend (`shared_with_id`).
/// Existence of the row means the share is active.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SharedSchedule {
    pub id: String,
    pub user_id: String,
    pub shared_with_id: String,
    pub schedule_id: String,
    pub permission_level: PermissionLevel,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl SharedSchedule {
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}
