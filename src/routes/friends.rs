use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{Friendship, FriendshipStatus};
use crate::error::{AppError, AppResult};
use crate::i18n::t;
use crate::routes::auth::AuthUser;
use crate::routes::MessageResponse;
use crate::services::friends::FriendshipManager;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_friends).post(request_friend))
        .route("/by-email", post(request_friend_by_email))
        .route(
            "/:id",
            get(get_friend).put(respond_to_request).delete(remove_friend),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<FriendshipStatus>,
}

#[derive(Debug, Deserialize)]
pub struct FriendRequest {
    pub friend_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FriendByEmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub status: FriendshipStatus,
}

#[derive(Debug, Serialize)]
pub struct FriendshipResponse {
    pub id: String,
    pub user_id: String,
    pub friend_id: String,
    pub status: FriendshipStatus,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl From<Friendship> for FriendshipResponse {
    fn from(f: Friendship) -> Self {
        Self {
            id: f.id,
            user_id: f.user_id,
            friend_id: f.friend_id,
            status: f.status,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_friends(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<FriendshipResponse>>> {
    let friendships = FriendshipManager::list(&state, &user.id, query.status).await?;
    Ok(Json(friendships.into_iter().map(Into::into).collect()))
}

async fn request_friend(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<FriendRequest>,
) -> AppResult<Json<FriendshipResponse>> {
    let friendship =
        FriendshipManager::request_by_user_id(&state, &user.id, &request.friend_id).await?;
    Ok(Json(friendship.into()))
}

async fn request_friend_by_email(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<FriendByEmailRequest>,
) -> AppResult<Json<FriendshipResponse>> {
    let friendship = FriendshipManager::request_by_email(&state, &user.id, &request.email).await?;
    Ok(Json(friendship.into()))
}

async fn get_friend(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<FriendshipResponse>> {
    let friendship = FriendshipManager::get(&state, &id, &user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(t("not_found.friend")))?;
    Ok(Json(friendship.into()))
}

async fn respond_to_request(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<RespondRequest>,
) -> AppResult<Json<FriendshipResponse>> {
    let friendship = FriendshipManager::respond(&state, &id, &user.id, request.status).await?;
    Ok(Json(friendship.into()))
}

async fn remove_friend(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    if !FriendshipManager::remove(&state, &id, &user.id).await? {
        return Err(AppError::NotFound(t("not_found.friend")));
    }
    Ok(Json(MessageResponse::new(t("friends.deleted"))))
}
