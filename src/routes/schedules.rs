use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::db::{CreateSchedule, Schedule, ScheduleFilter, UpdateSchedule};
use crate::error::{AppError, AppResult};
use crate::i18n::t;
use crate::routes::auth::AuthUser;
use crate::routes::MessageResponse;
use crate::services::schedules::ScheduleService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_schedules).post(create_schedule))
        .route(
            "/:id",
            get(get_schedule)
                .put(update_schedule)
                .delete(delete_schedule),
        )
}

async fn list_schedules(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(filter): Query<ScheduleFilter>,
) -> AppResult<Json<Vec<Schedule>>> {
    Ok(Json(ScheduleService::list(&state, &user.id, &filter).await?))
}

async fn create_schedule(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateSchedule>,
) -> AppResult<(StatusCode, Json<Schedule>)> {
    let schedule = ScheduleService::create(&state, &user.id, request).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

async fn get_schedule(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Schedule>> {
    let schedule = ScheduleService::get(&state, &id, &user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(t("not_found.schedule")))?;
    Ok(Json(schedule))
}

async fn update_schedule(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateSchedule>,
) -> AppResult<Json<Schedule>> {
    let schedule = ScheduleService::update(&state, &id, &user.id, request)
        .await?
        .ok_or_else(|| AppError::NotFound(t("not_found.schedule")))?;
    Ok(Json(schedule))
}

async fn delete_schedule(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    if !ScheduleService::delete(&state, &id, &user.id).await? {
        return Err(AppError::NotFound(t("not_found.schedule")));
    }
    Ok(Json(MessageResponse::new(t("schedules.deleted"))))
}
