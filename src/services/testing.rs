//! Shared fixtures for service and route tests.

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::config::Config;
use crate::db::{CreateSchedule, Schedule, User};
use crate::services::init::{init_db, init_memory_db};
use crate::services::schedules::ScheduleService;
use crate::services::users::{RegisterUser, UserService};
use crate::AppState;

pub const PASSWORD: &str = "Secret123";

pub fn config() -> Config {
    let mut config = Config::default();
    config.jwt.secret = "test-secret".to_string();
    config
}

pub async fn state() -> Arc<AppState> {
    state_with(config()).await
}

pub async fn state_with(config: Config) -> Arc<AppState> {
    let db = init_memory_db().await.unwrap();
    Arc::new(AppState { db, config })
}

/// File-backed database with several pooled connections, for tests that race
/// writers against each other. Keep the directory alive for the test's duration.
pub async fn file_state(max_connections: u32) -> (tempfile::TempDir, Arc<AppState>) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config();
    config.database.url = format!("sqlite://{}", dir.path().join("app.db").display());
    config.database.max_connections = max_connections;

    let db = init_db(&config).await.unwrap();
    (dir, Arc::new(AppState { db, config }))
}

/// Register `<name>` / `<name>@example.com` with [`PASSWORD`].
pub async fn register(state: &Arc<AppState>, name: &str) -> User {
    UserService::register(
        state,
        RegisterUser {
            email: format!("{name}@example.com"),
            username: name.to_string(),
            password: PASSWORD.to_string(),
        },
    )
    .await
    .unwrap()
}

pub fn at(hour: u32) -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

pub fn new_schedule(title: &str) -> CreateSchedule {
    CreateSchedule {
        title: title.to_string(),
        description: None,
        start_time: at(9),
        end_time: at(10),
        is_all_day: false,
        location: None,
        color: None,
        is_recurring: false,
        recurrence_rule: None,
    }
}

pub async fn schedule(state: &Arc<AppState>, owner: &User, title: &str) -> Schedule {
    ScheduleService::create(state, &owner.id, new_schedule(title))
        .await
        .unwrap()
}
