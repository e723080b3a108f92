//! Per-client rate limiting
//!
//! Simple in-memory fixed-window counter keyed by client IP. The peer
//! address is used unless the server runs behind a trusted proxy.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::state::AppState;

/// Rate limiter configuration
pub struct RateLimiter {
    /// Maximum requests per window
    max_requests: u32,
    /// Time window duration
    window: Duration,
    /// Request counts per client
    counts: RwLock<HashMap<String, (u32, Instant)>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            counts: RwLock::new(HashMap::new()),
        }
    }

    /// Check if a request from `key` is allowed.
    /// Also performs inline cleanup of expired entries when the map grows large.
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut counts = self.counts.write().await;

        if counts.len() > 10_000 {
            counts.retain(|_, (_, start)| now.duration_since(*start) <= self.window);
        }

        match counts.get_mut(key) {
            Some((count, window_start)) => {
                if now.duration_since(*window_start) > self.window {
                    *count = 1;
                    *window_start = now;
                    true
                } else if *count >= self.max_requests {
                    false
                } else {
                    *count += 1;
                    true
                }
            }
            None => {
                counts.insert(key.to_string(), (1, now));
                true
            }
        }
    }
}

/// Peer address of the connection. With `trust_proxy`, the first
/// X-Forwarded-For entry takes precedence.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(first) = headers
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return first.to_string();
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Reject with 429 once a client exceeds its budget for the current window
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer, state.config.trust_proxy);

    if !state.rate_limiter.check(&key).await {
        tracing::warn!(client = %key, "Rate limit exceeded");
        return (
            axum::http::StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "Too many requests, please try again later",
                "code": "RATE_LIMITED"
            })),
        )
            .into_response();
    }

    next.run(request).await
}
