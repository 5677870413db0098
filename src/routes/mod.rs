pub mod auth;
pub mod friends;
pub mod health;
pub mod schedules;
pub mod shared_schedules;
pub mod users;

use std::sync::{atomic::AtomicBool, Arc};
use std::thread::JoinHandle;

use axum::{routing::get, Router};
use http::HeaderValue;
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware;
use crate::AppState;

/// Body of successful deletes.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Build the full application router.
///
/// Returns the auth rate limiter's cleanup thread alongside the router so the
/// caller can join it after setting `shutdown`.
pub fn app(
    state: Arc<AppState>,
    shutdown: Arc<AtomicBool>,
) -> anyhow::Result<(Router, JoinHandle<()>)> {
    let (auth_routes, auth_cleaner) =
        middleware::rate_limit::limit_by_ip(auth::router(), &state.config.rate_limit, shutdown)?;

    let frontend_origin = state
        .config
        .server
        .frontend_url
        .parse::<HeaderValue>()
        .map_err(|e| anyhow::anyhow!("Invalid FRONTEND_URL for CORS: {e}"))?;

    let router = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", users::router())
        .nest("/api/schedules", schedules::router())
        .nest("/api/friends", friends::router())
        .nest("/api/shared-schedules", shared_schedules::router())
        .with_state(state)
        .layer(axum::middleware::from_fn(
            middleware::security_headers::security_headers,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(frontend_origin)
                .allow_methods([
                    http::Method::GET,
                    http::Method::POST,
                    http::Method::PUT,
                    http::Method::DELETE,
                    http::Method::OPTIONS,
                    http::Method::PATCH,
                ])
                .allow_headers([
                    http::header::CONTENT_TYPE,
                    http::header::AUTHORIZATION,
                    http::header::ACCEPT,
                ])
                .allow_credentials(true),
        );

    Ok((router, auth_cleaner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        shutdown: Arc<AtomicBool>,
    }

    impl TestApp {
        async fn new() -> Self {
            Self::with_config(testing::config()).await
        }

        async fn with_config(config: crate::config::Config) -> Self {
            let state = testing::state_with(config).await;
            let shutdown = Arc::new(AtomicBool::new(false));
            let (router, _cleaner) = app(state, shutdown.clone()).unwrap();
            Self { router, shutdown }
        }

        async fn send(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder()
                .method(method)
                .uri(uri)
                .header("x-forwarded-for", "10.0.0.1");
            if let Some(token) = token {
                builder = builder.header("authorization", format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }

        /// Register `name` and log in, returning (user id, token).
        async fn sign_up(&self, name: &str) -> (String, String) {
            let (status, user) = self
                .send(
                    "POST",
                    "/api/users",
                    None,
                    Some(json!({
                        "email": format!("{name}@example.com"),
                        "username": name,
                        "password": testing::PASSWORD,
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{user}");

            let (status, token) = self
                .send(
                    "POST",
                    "/api/auth/login",
                    None,
                    Some(json!({ "username": name, "password": testing::PASSWORD })),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "{token}");

            (
                user["id"].as_str().unwrap().to_string(),
                token["access_token"].as_str().unwrap().to_string(),
            )
        }
    }

    impl Drop for TestApp {
        fn drop(&mut self) {
            self.shutdown.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn health_reports_database() {
        let app = TestApp::new().await;
        let (status, body) = app.send("GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "ok");
    }

    #[tokio::test]
    async fn responses_carry_security_headers() {
        let app = TestApp::new().await;
        let response = app
            .router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let headers = response.headers();
        assert!(headers.contains_key("content-security-policy"));
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["referrer-policy"], "no-referrer");
    }

    #[tokio::test]
    async fn protected_routes_require_bearer_token() {
        let app = TestApp::new().await;

        let (status, body) = app.send("GET", "/api/friends", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, body) = app
            .send("GET", "/api/shared-schedules/shared-with-me", Some("garbage"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn me_returns_profile_without_password() {
        let app = TestApp::new().await;
        let (id, token) = app.sign_up("alice").await;

        let (status, me) = app.send("GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"], id.as_str());
        assert_eq!(me["username"], "alice");
        assert!(me.get("hashed_password").is_none());

        let (status, found) = app
            .send(
                "GET",
                "/api/users/by-email?email=alice@example.com",
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["id"], id.as_str());
    }

    #[tokio::test]
    async fn friend_errors_map_to_status_codes() {
        let app = TestApp::new().await;
        let (alice, alice_token) = app.sign_up("alice").await;
        let (bob, _) = app.sign_up("bob").await;

        let (status, body) = app
            .send(
                "POST",
                "/api/friends",
                Some(&alice_token),
                Some(json!({ "friend_id": alice })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "SELF_REFERENCE");

        let (status, _) = app
            .send(
                "POST",
                "/api/friends/by-email",
                Some(&alice_token),
                Some(json!({ "email": "ghost@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, request) = app
            .send(
                "POST",
                "/api/friends",
                Some(&alice_token),
                Some(json!({ "friend_id": bob })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(request["status"], "pending");

        let uri = format!("/api/friends/{}", request["id"].as_str().unwrap());
        let (status, body) = app
            .send("PUT", &uri, Some(&alice_token), Some(json!({ "status": "accepted" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");

        let (status, pending) = app
            .send("GET", "/api/friends?status=pending", Some(&alice_token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pending.as_array().unwrap().len(), 1);

        let (status, body) = app.send("DELETE", &uri, Some(&alice_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());

        let (status, _) = app.send("GET", &uri, Some(&alice_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn sharing_scenario_over_http() {
        let app = TestApp::new().await;
        let (_, a_token) = app.sign_up("user_a").await;
        let (b, b_token) = app.sign_up("user_b").await;

        let (_, request) = app
            .send(
                "POST",
                "/api/friends/by-email",
                Some(&a_token),
                Some(json!({ "email": "user_b@example.com" })),
            )
            .await;
        assert_eq!(request["status"], "pending");

        let friend_uri = format!("/api/friends/{}", request["id"].as_str().unwrap());
        let (status, accepted) = app
            .send("PUT", &friend_uri, Some(&b_token), Some(json!({ "status": "accepted" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(accepted["status"], "accepted");

        let (status, schedule) = app
            .send(
                "POST",
                "/api/schedules",
                Some(&a_token),
                Some(json!({
                    "title": "Planning",
                    "start_time": "2024-03-01T09:00:00",
                    "end_time": "2024-03-01T10:00:00",
                    "color": "#3366FF"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{schedule}");
        let schedule_id = schedule["id"].as_str().unwrap();

        let (status, share) = app
            .send(
                "POST",
                "/api/shared-schedules",
                Some(&a_token),
                Some(json!({ "schedule_id": schedule_id, "shared_with_id": b })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{share}");
        assert_eq!(share["permission_level"], "view");

        let share_uri = format!("/api/shared-schedules/{}", share["id"].as_str().unwrap());
        let (status, _) = app
            .send(
                "PUT",
                &share_uri,
                Some(&b_token),
                Some(json!({ "permission_level": "edit" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, edited) = app
            .send(
                "PUT",
                &share_uri,
                Some(&a_token),
                Some(json!({ "permission_level": "edit" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(edited["permission_level"], "edit");

        let (_, with_data) = app
            .send(
                "GET",
                "/api/shared-schedules/shared-with-me-with-data",
                Some(&b_token),
                None,
            )
            .await;
        assert_eq!(with_data[0]["title"], "Planning");

        let (status, _) = app.send("DELETE", &share_uri, Some(&b_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.send("DELETE", &share_uri, Some(&a_token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, received) = app
            .send("GET", "/api/shared-schedules/shared-with-me", Some(&b_token), None)
            .await;
        assert!(received.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sharing_with_non_friend_is_forbidden() {
        let app = TestApp::new().await;
        let (_, a_token) = app.sign_up("user_a").await;
        let (b, _) = app.sign_up("user_b").await;

        let (_, schedule) = app
            .send(
                "POST",
                "/api/schedules",
                Some(&a_token),
                Some(json!({
                    "title": "Private",
                    "start_time": "2024-03-01T09:00:00",
                    "end_time": "2024-03-01T10:00:00"
                })),
            )
            .await;

        let (status, body) = app
            .send(
                "POST",
                "/api/shared-schedules",
                Some(&a_token),
                Some(json!({ "schedule_id": schedule["id"], "shared_with_id": b })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn schedule_validation_is_unprocessable() {
        let app = TestApp::new().await;
        let (_, token) = app.sign_up("alice").await;

        let (status, body) = app
            .send(
                "POST",
                "/api/schedules",
                Some(&token),
                Some(json!({
                    "title": "Backwards",
                    "start_time": "2024-03-01T10:00:00",
                    "end_time": "2024-03-01T09:00:00"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn account_routes_are_limited_to_their_holder() {
        let app = TestApp::new().await;
        let (alice, alice_token) = app.sign_up("alice").await;
        let (_, bob_token) = app.sign_up("bob").await;

        let (status, users) = app
            .send("GET", "/api/users?skip=1&limit=5", Some(&bob_token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(users.as_array().unwrap().len(), 1);
        assert_eq!(users[0]["username"], "bob");
        assert_eq!(users[0]["is_superuser"], false);

        let uri = format!("/api/users/{alice}");
        let (status, body) = app
            .send("PUT", &uri, Some(&bob_token), Some(json!({ "username": "mallory" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");

        let (status, _) = app.send("DELETE", &uri, Some(&bob_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, renamed) = app
            .send("PUT", &uri, Some(&alice_token), Some(json!({ "username": "alice_2" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["username"], "alice_2");

        let (status, body) = app.send("DELETE", &uri, Some(&alice_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());

        // The token now names a deleted account.
        let (status, _) = app.send("GET", "/api/users/me", Some(&alice_token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_routes_are_rate_limited() {
        let mut config = testing::config();
        config.rate_limit.auth_per_second = 60;
        config.rate_limit.auth_burst = 1;
        let app = TestApp::with_config(config).await;

        let login = json!({ "username": "nobody", "password": "Secret123" });
        let (first, _) = app
            .send("POST", "/api/auth/login", None, Some(login.clone()))
            .await;
        assert_eq!(first, StatusCode::UNAUTHORIZED);

        let (second, body) = app
            .send("POST", "/api/auth/login", None, Some(login))
            .await;
        assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["code"], "RATE_LIMITED");
    }
}
