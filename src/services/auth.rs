use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::{User, UserRepository};
use crate::error::{AppError, AppResult};
use crate::i18n::t;
use crate::AppState;

#[cfg(not(test))]
const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const BCRYPT_COST: u32 = 4;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

pub struct AuthService;

impl AuthService {
    /// Issue an HS256 access token for `user_id`.
    pub fn create_jwt(state: &Arc<AppState>, user_id: &str) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::minutes(state.config.jwt.expiration_minutes);
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(state.config.jwt.secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub fn decode_jwt(state: &Arc<AppState>, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Resolve a bearer token to a live account.
    pub async fn get_user_from_token(state: &Arc<AppState>, token: &str) -> AppResult<User> {
        let claims = Self::decode_jwt(state, token)?;
        let user = UserRepository::find_by_id(&state.db, &claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !user.is_active {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Check a login (e-mail or username) and password pair.
    pub async fn authenticate(
        state: &Arc<AppState>,
        login: &str,
        password: &str,
    ) -> AppResult<User> {
        let Some(user) = UserRepository::find_by_login(&state.db, login.trim()).await? else {
            tracing::warn!("Login attempt for unknown account");
            return Err(AppError::Unauthorized);
        };

        if !Self::verify_password(password, &user.hashed_password).await? {
            tracing::warn!("Wrong password for user {}", user.id);
            return Err(AppError::Unauthorized);
        }

        if !user.is_active {
            return Err(AppError::BadRequest(t("auth.inactive_account")));
        }

        tracing::info!("User {} logged in", user.id);
        Ok(user)
    }

    /// bcrypt is CPU-bound, so hashing runs on the blocking pool.
    pub async fn hash_password(password: &str) -> AppResult<String> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing task failed: {e}")))?
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {e}")))
    }

    pub async fn verify_password(password: &str, hashed: &str) -> AppResult<bool> {
        let password = password.to_string();
        let hashed = hashed.to_string();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password check task failed: {e}")))?
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password check failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing;

    #[tokio::test]
    async fn token_round_trip_resolves_user() {
        let state = testing::state().await;
        let alice = testing::register(&state, "alice").await;

        let token = AuthService::create_jwt(&state, &alice.id).unwrap();
        let claims = AuthService::decode_jwt(&state, &token).unwrap();
        assert_eq!(claims.sub, alice.id);
        assert!(claims.exp > claims.iat);

        let user = AuthService::get_user_from_token(&state, &token).await.unwrap();
        assert_eq!(user.id, alice.id);
    }

    #[tokio::test]
    async fn token_signed_with_another_secret_is_rejected() {
        let state = testing::state().await;
        let alice = testing::register(&state, "alice").await;
        let token = AuthService::create_jwt(&state, &alice.id).unwrap();

        let mut other = testing::state().await;
        Arc::get_mut(&mut other).unwrap().config.jwt.secret = "another-secret".to_string();

        let err = AuthService::decode_jwt(&other, &token).unwrap_err();
        assert!(matches!(err, AppError::Jwt(_)));
    }

    #[tokio::test]
    async fn token_for_missing_user_is_unauthorized() {
        let state = testing::state().await;
        let token = AuthService::create_jwt(&state, "ghost").unwrap();

        let err = AuthService::get_user_from_token(&state, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn authenticate_accepts_email_or_username() {
        let state = testing::state().await;
        let alice = testing::register(&state, "alice").await;

        let by_name = AuthService::authenticate(&state, "alice", testing::PASSWORD)
            .await
            .unwrap();
        let by_email = AuthService::authenticate(&state, "alice@example.com", testing::PASSWORD)
            .await
            .unwrap();
        assert_eq!(by_name.id, alice.id);
        assert_eq!(by_email.id, alice.id);

        let wrong = AuthService::authenticate(&state, "alice", "Wrong1234").await;
        assert!(matches!(wrong, Err(AppError::Unauthorized)));
        let unknown = AuthService::authenticate(&state, "nobody", testing::PASSWORD).await;
        assert!(matches!(unknown, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn inactive_account_cannot_log_in() {
        let state = testing::state().await;
        let alice = testing::register(&state, "alice").await;
        sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?")
            .bind(&alice.id)
            .execute(&state.db)
            .await
            .unwrap();

        let err = AuthService::authenticate(&state, "alice", testing::PASSWORD)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
