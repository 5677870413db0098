//! Per-IP rate limiting for the public auth endpoints.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use axum::{body::Body, response::IntoResponse, Router};
use http::{HeaderMap, HeaderValue, StatusCode};
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_governor::{GovernorError, GovernorLayer};

use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::AppState;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Wrap `router` in a governor keyed by client IP (X-Forwarded-For, X-Real-IP,
/// Forwarded, then the peer address).
///
/// Also starts the thread that prunes limiter state; it exits once `shutdown`
/// is set.
pub fn limit_by_ip(
    router: Router<Arc<AppState>>,
    config: &RateLimitConfig,
    shutdown: Arc<AtomicBool>,
) -> anyhow::Result<(Router<Arc<AppState>>, JoinHandle<()>)> {
    let mut builder = GovernorConfigBuilder::default().key_extractor(SmartIpKeyExtractor);
    builder.per_second(config.auth_per_second.into());
    builder.burst_size(config.auth_burst);
    builder.error_handler(rate_limit_response);

    let governor_conf = Arc::new(
        builder
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Failed to build auth governor config"))?,
    );

    let cleaner = {
        let limiter = governor_conf.limiter().clone();
        std::thread::spawn(move || {
            let tick = Duration::from_secs(1);
            loop {
                for _ in 0..CLEANUP_INTERVAL.as_secs() {
                    if shutdown.load(Ordering::SeqCst) {
                        tracing::info!("Auth rate limiter cleanup thread exiting");
                        return;
                    }
                    std::thread::sleep(tick);
                }
                tracing::debug!("auth rate limiter size: {}", limiter.len());
                limiter.retain_recent();
            }
        })
    };

    let layer = GovernorLayer {
        config: governor_conf,
    };

    Ok((router.layer(layer), cleaner))
}

/// Error bodies in the `AppError` shape; 429 also carries `Retry-After`.
fn rate_limit_response(error: GovernorError) -> http::Response<Body> {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            tracing::debug!("Auth rate limit hit, retry after {}s", wait_time);
            let mut resp = AppError::RateLimited.into_response();
            append_headers(&mut resp, headers);
            resp.headers_mut()
                .insert(http::header::RETRY_AFTER, HeaderValue::from(wait_time));
            resp
        }
        GovernorError::UnableToExtractKey => {
            tracing::warn!("Rate limiter could not determine client IP");
            json_response(
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": {
                        "code": "INVALID_REQUEST",
                        "message": "Unable to determine client IP for rate limiting"
                    }
                }),
            )
        }
        GovernorError::Other { code, msg, headers } => {
            let status =
                StatusCode::from_u16(code.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let mut resp = json_response(
                status,
                serde_json::json!({
                    "error": {
                        "code": "RATE_LIMIT_ERROR",
                        "message": msg.unwrap_or_else(|| "Rate limiting error".to_string())
                    }
                }),
            );
            append_headers(&mut resp, headers);
            resp
        }
    }
}

fn json_response(status: StatusCode, body: serde_json::Value) -> http::Response<Body> {
    let mut resp = http::Response::new(Body::from(body.to_string()));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    resp
}

fn append_headers(resp: &mut http::Response<Body>, headers: Option<HeaderMap>) {
    if let Some(hmap) = headers {
        for (name, value) in hmap.iter() {
            resp.headers_mut().append(name.clone(), value.clone());
        }
    }
}
