use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::User;
use crate::error::{AppError, AppResult};
use crate::i18n::t;
use crate::routes::auth::AuthUser;
use crate::routes::MessageResponse;
use crate::services::users::{RegisterUser, UpdateMe, UserService};
use crate::AppState;

/// Router for account endpoints. Registration is the only public route.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users).post(register))
        .route("/me", get(get_me).put(update_me))
        .route("/by-email", get(find_by_email))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            username: u.username,
            is_active: u.is_active,
            is_superuser: u.is_superuser,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Just enough to address a friend request.
#[derive(Debug, Serialize)]
pub struct UserLookupResponse {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = UserService::list(&state, query.skip, query.limit).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = UserService::register(&state, request).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn get_me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(user.into())
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpdateMe>,
) -> AppResult<Json<UserResponse>> {
    let updated = UserService::update_me(&state, &user, request).await?;
    Ok(Json(updated.into()))
}

async fn find_by_email(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Query(query): Query<EmailQuery>,
) -> AppResult<Json<UserLookupResponse>> {
    let found = UserService::find_by_email(&state, &query.email)
        .await?
        .ok_or_else(|| AppError::NotFound(t("not_found.user_by_email")))?;

    Ok(Json(UserLookupResponse {
        id: found.id,
        username: found.username,
        email: found.email,
    }))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<UserResponse>> {
    let user = UserService::find_by_id(&state, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(t("not_found.user")))?;

    Ok(Json(user.into()))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateMe>,
) -> AppResult<Json<UserResponse>> {
    let updated = UserService::update(&state, &user, &id, request)
        .await?
        .ok_or_else(|| AppError::NotFound(t("not_found.user")))?;

    Ok(Json(updated.into()))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    if !UserService::delete(&state, &user, &id).await? {
        return Err(AppError::NotFound(t("not_found.user")));
    }
    Ok(Json(MessageResponse::new(t("users.deleted"))))
}
