use std::sync::Arc;

use serde::Deserialize;

use crate::config::AccountsConfig;
use crate::db::{UpdateUser, User, UserRepository};
use crate::error::{AppError, AppResult};
use crate::i18n::{t, t_with};
use crate::services::auth::AuthService;
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUser {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMe {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

pub struct UserService;

impl UserService {
    pub async fn register(state: &Arc<AppState>, input: RegisterUser) -> AppResult<User> {
        let accounts = &state.config.accounts;
        let email = normalize_email(&input.email);
        let username = input.username.trim().to_string();

        validate_email(&email)?;
        validate_username(accounts, &username)?;
        validate_password(accounts, &input.password)?;

        if UserRepository::find_by_email(&state.db, &email).await?.is_some() {
            return Err(AppError::Conflict(t("conflict.email_taken")));
        }
        if UserRepository::find_by_username(&state.db, &username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(t("conflict.username_taken")));
        }

        let hashed = AuthService::hash_password(&input.password).await?;

        match UserRepository::create(&state.db, &email, &username, &hashed, false).await {
            Ok(user) => {
                tracing::info!("Registered user {} ({})", user.id, user.username);
                Ok(user)
            }
            Err(e) if e.is_unique_violation() => Err(Self::taken(state, &email).await?),
            Err(e) => Err(e),
        }
    }

    /// Change the caller's own e-mail, username or password.
    pub async fn update_me(
        state: &Arc<AppState>,
        user: &User,
        changes: UpdateMe,
    ) -> AppResult<User> {
        Self::apply_changes(state, user, changes).await
    }

    /// Change someone's account. Allowed for the account holder and superusers;
    /// `None` when the account does not exist.
    pub async fn update(
        state: &Arc<AppState>,
        actor: &User,
        user_id: &str,
        changes: UpdateMe,
    ) -> AppResult<Option<User>> {
        authorize(actor, user_id)?;

        let Some(target) = UserRepository::find_by_id(&state.db, user_id).await? else {
            return Ok(None);
        };
        Self::apply_changes(state, &target, changes).await.map(Some)
    }

    /// Delete an account along with everything it owns. Same rule as [`Self::update`].
    pub async fn delete(state: &Arc<AppState>, actor: &User, user_id: &str) -> AppResult<bool> {
        authorize(actor, user_id)?;

        let deleted = UserRepository::delete(&state.db, user_id).await?;
        if deleted {
            tracing::info!("User {} deleted by {}", user_id, actor.id);
        }
        Ok(deleted)
    }

    pub async fn list(state: &Arc<AppState>, skip: i64, limit: i64) -> AppResult<Vec<User>> {
        if skip < 0 || limit < 0 {
            return Err(AppError::Validation(t("validation.pagination")));
        }
        UserRepository::list(&state.db, skip, limit).await
    }

    /// Create the configured superuser while nobody has an account yet.
    pub async fn seed_admin(state: &Arc<AppState>) -> AppResult<Option<User>> {
        if UserRepository::count(&state.db).await? > 0 {
            return Ok(None);
        }

        let admin = &state.config.accounts.admin;
        let Some(password) = admin.password.as_deref() else {
            tracing::warn!("No accounts exist and ADMIN_PASSWORD is unset; not creating a superuser");
            return Ok(None);
        };

        let email = normalize_email(&admin.email);
        validate_email(&email)?;
        let hashed = AuthService::hash_password(password).await?;

        let user =
            UserRepository::create(&state.db, &email, admin.username.trim(), &hashed, true).await?;
        tracing::info!("Created superuser {} ({})", user.id, user.username);
        Ok(Some(user))
    }

    async fn apply_changes(
        state: &Arc<AppState>,
        user: &User,
        changes: UpdateMe,
    ) -> AppResult<User> {
        let accounts = &state.config.accounts;
        let mut update = UpdateUser::default();

        if let Some(email) = changes.email.as_deref().map(normalize_email) {
            if email != user.email {
                validate_email(&email)?;
                if UserRepository::find_by_email(&state.db, &email).await?.is_some() {
                    return Err(AppError::Conflict(t("conflict.email_taken")));
                }
                update.email = Some(email);
            }
        }

        if let Some(username) = changes.username.as_deref().map(str::trim) {
            if username != user.username {
                validate_username(accounts, username)?;
                if UserRepository::find_by_username(&state.db, username)
                    .await?
                    .is_some()
                {
                    return Err(AppError::Conflict(t("conflict.username_taken")));
                }
                update.username = Some(username.to_string());
            }
        }

        if let Some(password) = changes.password.as_deref() {
            validate_password(accounts, password)?;
            update.hashed_password = Some(AuthService::hash_password(password).await?);
        }

        let email = update.email.clone().unwrap_or_else(|| user.email.clone());
        match UserRepository::update(&state.db, &user.id, &update).await {
            Ok(Some(updated)) => {
                tracing::info!("Updated account of user {}", updated.id);
                Ok(updated)
            }
            Ok(None) => Err(AppError::NotFound(t("not_found.user"))),
            Err(e) if e.is_unique_violation() => Err(Self::taken(state, &email).await?),
            Err(e) => Err(e),
        }
    }

    pub async fn find_by_id(state: &Arc<AppState>, id: &str) -> AppResult<Option<User>> {
        UserRepository::find_by_id(&state.db, id).await
    }

    pub async fn find_by_email(state: &Arc<AppState>, email: &str) -> AppResult<Option<User>> {
        UserRepository::find_by_email(&state.db, &normalize_email(email)).await
    }

    /// Conflict error naming whichever unique column lost a concurrent race.
    async fn taken(state: &Arc<AppState>, email: &str) -> AppResult<AppError> {
        let key = if UserRepository::find_by_email(&state.db, email)
            .await?
            .is_some()
        {
            "conflict.email_taken"
        } else {
            "conflict.username_taken"
        };
        Ok(AppError::Conflict(t(key)))
    }
}

fn authorize(actor: &User, user_id: &str) -> AppResult<()> {
    if actor.id == user_id || actor.is_superuser {
        return Ok(());
    }
    tracing::warn!("User {} tried to manage account {}", actor.id, user_id);
    Err(AppError::Forbidden(t("users.forbidden")))
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> AppResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
                && email.len() <= 254
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(t("validation.email")))
    }
}

pub fn validate_username(accounts: &AccountsConfig, username: &str) -> AppResult<()> {
    let len = username.chars().count();
    if len < accounts.username_min_length || len > accounts.username_max_length {
        let min = accounts.username_min_length.to_string();
        let max = accounts.username_max_length.to_string();
        return Err(AppError::Validation(t_with(
            "validation.username_length",
            &[("min", &min), ("max", &max)],
        )));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::Validation(t("validation.username_charset")));
    }

    Ok(())
}

pub fn validate_password(accounts: &AccountsConfig, password: &str) -> AppResult<()> {
    if password.chars().count() < accounts.password_min_length {
        let min = accounts.password_min_length.to_string();
        return Err(AppError::Validation(t_with(
            "validation.password_length",
            &[("min", &min)],
        )));
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(AppError::Validation(t("validation.password_uppercase")));
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(AppError::Validation(t("validation.password_lowercase")));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(t("validation.password_digit")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::friends::FriendshipManager;
    use crate::services::testing;

    fn accounts() -> AccountsConfig {
        testing::config().accounts
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("a@b.co").is_ok());
        for bad in ["", "plain", "@b.co", "a@b", "a@.b", "a@b.", "a@@b.co", "a b@c.de"] {
            assert!(validate_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn username_rules() {
        let accounts = accounts();
        assert!(validate_username(&accounts, "alice_01-x").is_ok());
        assert!(validate_username(&accounts, "al").is_err());
        assert!(validate_username(&accounts, &"a".repeat(51)).is_err());
        assert!(validate_username(&accounts, "alice!").is_err());
        assert!(validate_username(&accounts, "алиса").is_err());
    }

    #[test]
    fn password_rules() {
        let accounts = accounts();
        assert!(validate_password(&accounts, "Secret123").is_ok());
        assert!(validate_password(&accounts, "Sh0rt").is_err());
        assert!(validate_password(&accounts, "secret123").is_err());
        assert!(validate_password(&accounts, "SECRET123").is_err());
        assert!(validate_password(&accounts, "SecretOnly").is_err());
    }

    #[tokio::test]
    async fn register_hashes_password_and_normalizes_email() {
        let state = testing::state().await;
        let user = UserService::register(
            &state,
            RegisterUser {
                email: "  Alice@Example.COM ".to_string(),
                username: "alice".to_string(),
                password: testing::PASSWORD.to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(user.email, "alice@example.com");
        assert!(user.is_active);
        assert!(!user.is_superuser);
        assert_ne!(user.hashed_password, testing::PASSWORD);
        assert!(AuthService::verify_password(testing::PASSWORD, &user.hashed_password)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn register_rejects_taken_email_and_username() {
        let state = testing::state().await;
        testing::register(&state, "alice").await;

        let same_email = UserService::register(
            &state,
            RegisterUser {
                email: "alice@example.com".to_string(),
                username: "alice2".to_string(),
                password: testing::PASSWORD.to_string(),
            },
        )
        .await;
        assert!(matches!(same_email, Err(AppError::Conflict(_))));

        let same_name = UserService::register(
            &state,
            RegisterUser {
                email: "other@example.com".to_string(),
                username: "alice".to_string(),
                password: testing::PASSWORD.to_string(),
            },
        )
        .await;
        assert!(matches!(same_name, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_me_changes_only_given_fields() {
        let state = testing::state().await;
        let alice = testing::register(&state, "alice").await;

        let updated = UserService::update_me(
            &state,
            &alice,
            UpdateMe {
                username: Some("alice_new".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.username, "alice_new");
        assert_eq!(updated.email, alice.email);
        assert_eq!(updated.hashed_password, alice.hashed_password);
    }

    #[tokio::test]
    async fn update_me_refuses_someone_elses_email() {
        let state = testing::state().await;
        let alice = testing::register(&state, "alice").await;
        testing::register(&state, "bob").await;

        let err = UserService::update_me(
            &state,
            &alice,
            UpdateMe {
                email: Some("BOB@example.com".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Re-submitting your own values is not a conflict.
        let same = UserService::update_me(
            &state,
            &alice,
            UpdateMe {
                email: Some(alice.email.clone()),
                username: Some(alice.username.clone()),
                password: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(same.email, alice.email);
    }

    #[tokio::test]
    async fn update_me_rehashes_password() {
        let state = testing::state().await;
        let alice = testing::register(&state, "alice").await;

        UserService::update_me(
            &state,
            &alice,
            UpdateMe {
                password: Some("Another456".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(AuthService::authenticate(&state, "alice", "Another456")
            .await
            .is_ok());
        assert!(AuthService::authenticate(&state, "alice", testing::PASSWORD)
            .await
            .is_err());
    }

    async fn admin_state() -> (Arc<AppState>, User) {
        let mut config = testing::config();
        config.accounts.admin.password = Some("Admin1234".to_string());
        let state = testing::state_with(config).await;
        let admin = UserService::seed_admin(&state).await.unwrap().unwrap();
        (state, admin)
    }

    #[tokio::test]
    async fn seeds_superuser_only_into_empty_table() {
        let (state, admin) = admin_state().await;
        assert!(admin.is_superuser);
        assert_eq!(admin.email, "admin@example.com");
        assert!(AuthService::authenticate(&state, "admin", "Admin1234")
            .await
            .is_ok());

        assert!(UserService::seed_admin(&state).await.unwrap().is_none());
        assert_eq!(UserService::list(&state, 0, 100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn no_superuser_without_configured_password() {
        let state = testing::state().await;
        assert!(UserService::seed_admin(&state).await.unwrap().is_none());
        assert!(UserService::list(&state, 0, 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_pages_in_registration_order() {
        let state = testing::state().await;
        let alice = testing::register(&state, "alice").await;
        let bob = testing::register(&state, "bob").await;
        testing::register(&state, "carol").await;

        let page = UserService::list(&state, 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, bob.id);
        assert_eq!(UserService::list(&state, 0, 100).await.unwrap()[0].id, alice.id);

        let negative = UserService::list(&state, -1, 10).await;
        assert!(matches!(negative, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn only_holder_or_superuser_manages_an_account() {
        let (state, admin) = admin_state().await;
        let alice = testing::register(&state, "alice").await;
        let bob = testing::register(&state, "bob").await;

        let rename = || UpdateMe {
            username: Some("renamed".to_string()),
            ..Default::default()
        };

        let by_bob = UserService::update(&state, &bob, &alice.id, rename()).await;
        assert!(matches!(by_bob, Err(AppError::Forbidden(_))));
        let delete_by_bob = UserService::delete(&state, &bob, &alice.id).await;
        assert!(matches!(delete_by_bob, Err(AppError::Forbidden(_))));

        let by_admin = UserService::update(&state, &admin, &alice.id, rename())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_admin.username, "renamed");
        assert!(UserService::update(&state, &admin, "missing", rename())
            .await
            .unwrap()
            .is_none());

        assert!(UserService::delete(&state, &bob, &bob.id).await.unwrap());
        assert!(UserService::delete(&state, &admin, &alice.id).await.unwrap());
        assert!(!UserService::delete(&state, &admin, &alice.id).await.unwrap());
        assert!(UserService::find_by_id(&state, &alice.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn deleting_account_drops_its_friendships() {
        let state = testing::state().await;
        let alice = testing::register(&state, "alice").await;
        let bob = testing::register(&state, "bob").await;
        FriendshipManager::request_by_user_id(&state, &alice.id, &bob.id)
            .await
            .unwrap();

        assert!(UserService::delete(&state, &alice, &alice.id).await.unwrap());
        assert!(FriendshipManager::list(&state, &bob.id, None)
            .await
            .unwrap()
            .is_empty());
    }
}
