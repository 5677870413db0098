use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::db::{PermissionLevel, Schedule, SharedSchedule};
use crate::error::{AppError, AppResult};
use crate::i18n::t;
use crate::routes::auth::AuthUser;
use crate::routes::MessageResponse;
use crate::services::sharing::{NewShare, SharingGate};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_share))
        .route("/shared-by-me", get(shared_by_me))
        .route("/shared-with-me", get(shared_with_me))
        .route("/shared-with-me-with-data", get(shared_with_me_with_data))
        .route(
            "/:id",
            get(get_share).put(update_share).delete(revoke_share),
        )
}

#[derive(Debug, Deserialize)]
pub struct UpdateShareRequest {
    pub permission_level: PermissionLevel,
}

async fn create_share(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<NewShare>,
) -> AppResult<Json<SharedSchedule>> {
    let share = SharingGate::create(&state, &user.id, request).await?;
    Ok(Json(share))
}

async fn shared_by_me(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<SharedSchedule>>> {
    Ok(Json(SharingGate::list_owned_by_user(&state, &user.id).await?))
}

async fn shared_with_me(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<SharedSchedule>>> {
    Ok(Json(
        SharingGate::list_received_by_user(&state, &user.id).await?,
    ))
}

async fn shared_with_me_with_data(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<Schedule>>> {
    Ok(Json(
        SharingGate::list_received_with_schedule_data(&state, &user.id).await?,
    ))
}

async fn get_share(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<SharedSchedule>> {
    let share = SharingGate::get(&state, &id, &user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(t("not_found.shared_schedule")))?;
    Ok(Json(share))
}

async fn update_share(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateShareRequest>,
) -> AppResult<Json<SharedSchedule>> {
    let share = SharingGate::update_permission(&state, &id, &user.id, request.permission_level)
        .await?
        .ok_or_else(|| AppError::NotFound(t("not_found.shared_schedule_not_owner")))?;
    Ok(Json(share))
}

async fn revoke_share(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    if !SharingGate::revoke(&state, &id, &user.id).await? {
        return Err(AppError::NotFound(t("not_found.shared_schedule_not_owner")));
    }
    Ok(Json(MessageResponse::new(t("sharing.revoked"))))
}
