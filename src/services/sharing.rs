//! Schedule sharing between friends.
//!
//! An ACCEPTED friendship is required to create a share. After that the
//! share belongs to the schedule owner alone: only they can change its
//! permission level or revoke it. The target can read it but not administer it.

use std::sync::Arc;

use serde::Deserialize;

use crate::db::{
    PermissionLevel, Schedule, ScheduleRepository, SharedSchedule, SharedScheduleRepository,
};
use crate::error::{AppError, AppResult};
use crate::i18n::t;
use crate::services::friends::FriendshipManager;
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct NewShare {
    pub schedule_id: String,
    pub shared_with_id: String,
    #[serde(default)]
    pub permission_level: PermissionLevel,
}

pub struct SharingGate;

impl SharingGate {
    /// A share visible to its owner or its target. Anyone else gets `None`.
    pub async fn get(
        state: &Arc<AppState>,
        share_id: &str,
        user_id: &str,
    ) -> AppResult<Option<SharedSchedule>> {
        SharedScheduleRepository::find_visible(&state.db, share_id, user_id).await
    }

    pub async fn list_owned_by_user(
        state: &Arc<AppState>,
        user_id: &str,
    ) -> AppResult<Vec<SharedSchedule>> {
        SharedScheduleRepository::list_by_owner(&state.db, user_id).await
    }

    pub async fn list_received_by_user(
        state: &Arc<AppState>,
        user_id: &str,
    ) -> AppResult<Vec<SharedSchedule>> {
        SharedScheduleRepository::list_by_recipient(&state.db, user_id).await
    }

    /// Full schedules shared with the user, in one query.
    pub async fn list_received_with_schedule_data(
        state: &Arc<AppState>,
        user_id: &str,
    ) -> AppResult<Vec<Schedule>> {
        SharedScheduleRepository::list_schedules_shared_with(&state.db, user_id).await
    }

    /// Share one of the owner's schedules with a friend.
    ///
    /// Checked in order: the schedule belongs to the owner (else not found),
    /// the two users are ACCEPTED friends (else forbidden), and an existing
    /// share for the same schedule and target is returned as is.
    pub async fn create(
        state: &Arc<AppState>,
        owner_id: &str,
        input: NewShare,
    ) -> AppResult<SharedSchedule> {
        if ScheduleRepository::find_owned(&state.db, &input.schedule_id, owner_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(t("not_found.schedule_not_owned")));
        }

        if !FriendshipManager::are_friends(&state.db, owner_id, &input.shared_with_id).await? {
            tracing::warn!(
                "User {} tried to share schedule {} with non-friend {}",
                owner_id,
                input.schedule_id,
                input.shared_with_id
            );
            return Err(AppError::Forbidden(t("sharing.requires_friendship")));
        }

        if let Some(existing) = SharedScheduleRepository::find_by_triple(
            &state.db,
            owner_id,
            &input.shared_with_id,
            &input.schedule_id,
        )
        .await?
        {
            tracing::debug!(
                "Schedule {} already shared with {} as {}",
                input.schedule_id,
                input.shared_with_id,
                existing.id
            );
            return Ok(existing);
        }

        Self::insert_share(state, owner_id, &input).await
    }

    /// Insert the share in one statement. When the triple constraint rejects
    /// it, a concurrent call created the share first and that row is returned.
    async fn insert_share(
        state: &Arc<AppState>,
        owner_id: &str,
        input: &NewShare,
    ) -> AppResult<SharedSchedule> {
        match SharedScheduleRepository::create(
            &state.db,
            owner_id,
            &input.shared_with_id,
            &input.schedule_id,
            input.permission_level,
        )
        .await
        {
            Ok(share) => {
                tracing::info!(
                    "User {} shared schedule {} with {} ({})",
                    owner_id,
                    input.schedule_id,
                    input.shared_with_id,
                    share.permission_level.as_str()
                );
                Ok(share)
            }
            Err(e) if e.is_unique_violation() => {
                tracing::debug!(
                    "Concurrent share of schedule {} with {}, reusing existing record",
                    input.schedule_id,
                    input.shared_with_id
                );
                SharedScheduleRepository::find_by_triple(
                    &state.db,
                    owner_id,
                    &input.shared_with_id,
                    &input.schedule_id,
                )
                .await?
                .ok_or(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Change the permission level. `None` unless the caller owns the share.
    pub async fn update_permission(
        state: &Arc<AppState>,
        share_id: &str,
        user_id: &str,
        permission_level: PermissionLevel,
    ) -> AppResult<Option<SharedSchedule>> {
        let Some(share) = Self::find_owned(state, share_id, user_id).await? else {
            return Ok(None);
        };

        let updated = SharedScheduleRepository::update_permission(
            &state.db,
            &share.id,
            user_id,
            permission_level,
        )
        .await?;

        if let Some(updated) = &updated {
            tracing::info!(
                "Share {} permission changed from {} to {}",
                share_id,
                share.permission_level.as_str(),
                updated.permission_level.as_str()
            );
        }
        Ok(updated)
    }

    /// Revoke a share. False unless the caller owns it.
    pub async fn revoke(state: &Arc<AppState>, share_id: &str, user_id: &str) -> AppResult<bool> {
        let Some(share) = Self::find_owned(state, share_id, user_id).await? else {
            return Ok(false);
        };

        let deleted = SharedScheduleRepository::delete(&state.db, &share.id, user_id).await?;

        if deleted {
            tracing::info!("Share {} revoked by {}", share_id, user_id);
        }
        Ok(deleted)
    }

    async fn find_owned(
        state: &Arc<AppState>,
        share_id: &str,
        user_id: &str,
    ) -> AppResult<Option<SharedSchedule>> {
        let share = SharedScheduleRepository::find_visible(&state.db, share_id, user_id).await?;

        match share {
            Some(share) if share.is_owner(user_id) => Ok(Some(share)),
            Some(_) => {
                tracing::warn!(
                    "User {} tried to administer share {} they do not own",
                    user_id,
                    share_id
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
