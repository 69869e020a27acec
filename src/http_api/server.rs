//! Inbound HTTP API: `POST /sendMsg`, `GET /health`, `GET /status`
//! (spec.md §6.2). Grounded on the pack's `axum` usage for simple
//! JSON-in/JSON-out services (`hypernetix-hyperspot`'s API-gateway
//! modules), paired with `tower_http::cors::CorsLayer` for the
//! allow-everything CORS policy the spec calls for.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::config::store::ConfigStore;
use crate::core::notifier::NotifierClient;

pub struct ApiState<N: NotifierClient> {
    pub config_store: ConfigStore,
    pub notifier: Arc<N>,
    pub default_chat_id: String,
    pub endpoint_count: Mutex<usize>,
    rate_limiter: Mutex<RateLimiter>,
}

impl<N: NotifierClient> ApiState<N> {
    pub fn new(config_store: ConfigStore, notifier: Arc<N>, default_chat_id: String) -> Self {
        Self {
            config_store,
            notifier,
            default_chat_id,
            endpoint_count: Mutex::new(0),
            rate_limiter: Mutex::new(RateLimiter::new()),
        }
    }
}

struct RateLimiter {
    window_start: Instant,
    count: u32,
}

impl RateLimiter {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            count: 0,
        }
    }

    fn allow(&mut self, requests_per_minute: u32) -> bool {
        if self.window_start.elapsed() >= Duration::from_secs(60) {
            self.window_start = Instant::now();
            self.count = 0;
        }
        if self.count >= requests_per_minute {
            false
        } else {
            self.count += 1;
            true
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendMsgRequest {
    msg: String,
    #[serde(default)]
    #[allow(dead_code)]
    parse_mode: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    disable_preview: Option<bool>,
}

#[derive(Debug, Serialize)]
struct SendMsgResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    msg_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn build_router<N: NotifierClient + Send + Sync + 'static>(state: Arc<ApiState<N>>) -> Router {
    Router::new()
        .route("/sendMsg", post(send_msg::<N>))
        .route("/health", get(health))
        .route("/status", get(status::<N>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn status<N: NotifierClient + Send + Sync + 'static>(
    State(state): State<Arc<ApiState<N>>>,
) -> impl IntoResponse {
    let config = state.config_store.snapshot().await;
    Json(serde_json::json!({
        "endpoint_count": config.all_endpoints().len(),
        "notification_level": config.notification.level,
        "daily_report_enabled": config.daily_report.enabled,
    }))
}

async fn send_msg<N: NotifierClient + Send + Sync + 'static>(
    State(state): State<Arc<ApiState<N>>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    let config = state.config_store.snapshot().await;
    if !config.http_api.enabled {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(SendMsgResponse {
                success: false,
                msg_length: None,
                error: Some("messenger not ready".to_string()),
            }),
        );
    }

    let client_ip = super::auth::resolve_client_ip(&headers, peer.ip());
    if let Err(auth_error) = super::auth::authorize(&config.http_api, &headers, "", client_ip) {
        let (code, message) = match auth_error {
            super::auth::AuthError::IpNotAllowed => (StatusCode::FORBIDDEN, "IP not in allowlist"),
            super::auth::AuthError::MissingOrBadKey => (StatusCode::UNAUTHORIZED, "invalid API key"),
        };
        return (
            code,
            Json(SendMsgResponse {
                success: false,
                msg_length: None,
                error: Some(message.to_string()),
            }),
        );
    }

    if config.http_api.rate_limit.enabled {
        let mut limiter = state.rate_limiter.lock().await;
        if !limiter.allow(config.http_api.rate_limit.requests_per_minute) {
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(SendMsgResponse {
                    success: false,
                    msg_length: None,
                    error: Some("rate limit exceeded".to_string()),
                }),
            );
        }
    }

    let request: SendMsgRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(SendMsgResponse {
                    success: false,
                    msg_length: None,
                    error: Some("missing or malformed msg body".to_string()),
                }),
            );
        }
    };

    if request.msg.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(SendMsgResponse {
                success: false,
                msg_length: None,
                error: Some("msg must not be empty".to_string()),
            }),
        );
    }

    match state.notifier.send_message(&state.default_chat_id, &request.msg).await {
        Ok(()) => (
            StatusCode::OK,
            Json(SendMsgResponse {
                success: true,
                msg_length: Some(request.msg.chars().count()),
                error: None,
            }),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SendMsgResponse {
                success: false,
                msg_length: None,
                error: Some(e.to_string()),
            }),
        ),
    }
}
