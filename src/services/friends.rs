//! Friend-relationship lifecycle.
//!
//! A friendship is one directional record per unordered pair of users:
//!
//! ```text
//! PENDING --(recipient accepts)--> ACCEPTED
//! PENDING --(recipient rejects)--> REJECTED
//! any state --(either participant removes)--> gone
//! ```
//!
//! The recipient may answer again after a terminal state; the new status
//! simply overwrites the old one.

use std::sync::Arc;

use sqlx::SqliteExecutor;

use crate::db::{Friendship, FriendshipRepository, FriendshipStatus, UserRepository};
use crate::error::{AppError, AppResult};
use crate::i18n::t;
use crate::services::users::UserService;
use crate::AppState;

pub struct FriendshipManager;

impl FriendshipManager {
    /// The single record linking two users, whichever of them sent the request.
    ///
    /// Takes an executor so callers can run it inside their own transaction.
    pub async fn find_relation<'c, E>(
        executor: E,
        user_a: &str,
        user_b: &str,
    ) -> AppResult<Option<Friendship>>
    where
        E: SqliteExecutor<'c>,
    {
        FriendshipRepository::find_between(executor, user_a, user_b).await
    }

    /// True only when the two users have an ACCEPTED friendship.
    pub async fn are_friends<'c, E>(executor: E, user_a: &str, user_b: &str) -> AppResult<bool>
    where
        E: SqliteExecutor<'c>,
    {
        Ok(Self::find_relation(executor, user_a, user_b)
            .await?
            .is_some_and(|f| f.is_accepted()))
    }

    /// Every friendship the user takes part in, as requester or recipient.
    pub async fn list(
        state: &Arc<AppState>,
        user_id: &str,
        status: Option<FriendshipStatus>,
    ) -> AppResult<Vec<Friendship>> {
        FriendshipRepository::list_for_user(&state.db, user_id, status).await
    }

    /// A friendship by id, visible only to its two participants.
    pub async fn get(
        state: &Arc<AppState>,
        friendship_id: &str,
        user_id: &str,
    ) -> AppResult<Option<Friendship>> {
        FriendshipRepository::find_visible(&state.db, friendship_id, user_id).await
    }

    /// Send a friend request.
    ///
    /// Returns the existing record unchanged when the pair is already linked in
    /// either direction, so repeating the call never creates a second row.
    pub async fn request_by_user_id(
        state: &Arc<AppState>,
        requester_id: &str,
        target_id: &str,
    ) -> AppResult<Friendship> {
        if requester_id == target_id {
            tracing::warn!("User {} tried to befriend themselves", requester_id);
            return Err(AppError::SelfReference(t("friends.self_request")));
        }

        if UserRepository::find_by_id(&state.db, target_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(t("not_found.user")));
        }

        if let Some(existing) = Self::find_relation(&state.db, requester_id, target_id).await? {
            tracing::debug!(
                "Friendship {} already links {} and {}",
                existing.id,
                requester_id,
                target_id
            );
            return Ok(existing);
        }

        Self::insert_request(state, requester_id, target_id).await
    }

    /// Insert the PENDING row in one statement. When the pair index rejects it,
    /// another request linked the pair first and its record is returned.
    async fn insert_request(
        state: &Arc<AppState>,
        requester_id: &str,
        target_id: &str,
    ) -> AppResult<Friendship> {
        match FriendshipRepository::create(&state.db, requester_id, target_id).await {
            Ok(friendship) => {
                tracing::info!(
                    "Friend request {} sent from {} to {}",
                    friendship.id,
                    requester_id,
                    target_id
                );
                Ok(friendship)
            }
            Err(e) if e.is_unique_violation() => {
                tracing::debug!(
                    "Concurrent friend request between {} and {}, reusing existing record",
                    requester_id,
                    target_id
                );
                Self::find_relation(&state.db, requester_id, target_id)
                    .await?
                    .ok_or(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Send a friend request to whoever owns `email`.
    pub async fn request_by_email(
        state: &Arc<AppState>,
        requester_id: &str,
        email: &str,
    ) -> AppResult<Friendship> {
        let target = UserService::find_by_email(state, email)
            .await?
            .ok_or_else(|| AppError::NotFound(t("not_found.user_by_email")))?;

        Self::request_by_user_id(state, requester_id, &target.id).await
    }

    /// Accept or reject a request. Only the recipient may answer.
    pub async fn respond(
        state: &Arc<AppState>,
        friendship_id: &str,
        responder_id: &str,
        status: FriendshipStatus,
    ) -> AppResult<Friendship> {
        if status == FriendshipStatus::Pending {
            return Err(AppError::Validation(t("friends.invalid_response")));
        }

        let friendship = FriendshipRepository::find_visible(&state.db, friendship_id, responder_id)
            .await?
            .ok_or_else(|| AppError::NotFound(t("not_found.friend")))?;

        if !friendship.is_recipient(responder_id) {
            tracing::warn!(
                "User {} tried to answer their own friend request {}",
                responder_id,
                friendship_id
            );
            return Err(AppError::Forbidden(t("friends.only_recipient_responds")));
        }

        // The write re-checks the recipient, so a row removed meanwhile reads as not found.
        let updated =
            FriendshipRepository::update_status(&state.db, friendship_id, responder_id, status)
                .await?
                .ok_or_else(|| AppError::NotFound(t("not_found.friend")))?;

        tracing::info!(
            "Friendship {} changed from {} to {} by {}",
            friendship_id,
            friendship.status.as_str(),
            updated.status.as_str(),
            responder_id
        );
        Ok(updated)
    }

    /// End a friendship. Either participant may do this, whatever the status.
    ///
    /// Returns false when the record does not exist or the caller is not part of it.
    pub async fn remove(
        state: &Arc<AppState>,
        friendship_id: &str,
        user_id: &str,
    ) -> AppResult<bool> {
        let deleted = FriendshipRepository::delete(&state.db, friendship_id, user_id).await?;

        if deleted {
            tracing::info!("Friendship {} removed by {}", friendship_id, user_id);
        }
        Ok(deleted)
    }
}
