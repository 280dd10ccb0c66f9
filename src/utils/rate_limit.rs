// src/utils/rate_limit.rs

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;

use crate::{error::AppError, state::AppState};

/// Counter state of one client inside its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub count: u32,
    pub started_at: Instant,
}

/// Backing store for per-client windows.
///
/// `hit` records one request for `key` and returns the window it was counted in.
/// Implementations reset the window lazily when `now` lies past `window`.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn hit(&self, key: &str, now: Instant, window: Duration, max_requests: u32) -> WindowState;
}

#[derive(Default)]
struct Windows {
    entries: HashMap<String, WindowState>,
    last_sweep: Option<Instant>,
}

impl Windows {
    /// Drops expired windows, at most once per `window`.
    fn sweep(&mut self, now: Instant, window: Duration) {
        if let Some(last) = self.last_sweep {
            if now.duration_since(last) <= window {
                return;
            }
        }
        self.entries
            .retain(|_, state| now.duration_since(state.started_at) <= window);
        self.last_sweep = Some(now);
    }
}

/// Process-local store. Not shared between instances.
#[derive(Default)]
pub struct InMemoryRateLimitStore {
    windows: Mutex<Windows>,
}

impl InMemoryRateLimitStore {
    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.windows.lock().await.entries.len()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn hit(&self, key: &str, now: Instant, window: Duration, max_requests: u32) -> WindowState {
        let mut windows = self.windows.lock().await;
        windows.sweep(now, window);

        let entry = windows.entries.entry(key.to_string()).or_insert(WindowState {
            count: 0,
            started_at: now,
        });

        if now.duration_since(entry.started_at) > window {
            *entry = WindowState {
                count: 0,
                started_at: now,
            };
        }

        // Saturate one past the limit so a blocked client does not grow the counter forever.
        if entry.count <= max_requests {
            entry.count += 1;
        }

        *entry
    }
}

/// Fixed-window limiter configuration plus its store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, window: Duration, max_requests: u32) -> Self {
        Self {
            store,
            window,
            max_requests,
        }
    }

    /// Counts one request for `key`, failing once the window's budget is spent.
    pub async fn check(&self, key: &str, now: Instant) -> Result<(), AppError> {
        let state = self.store.hit(key, now, self.window, self.max_requests).await;
        if state.count > self.max_requests {
            return Err(AppError::TooManyRequests(format!(
                "Too many requests. Please try again after {} seconds.",
                self.window.as_secs()
            )));
        }
        Ok(())
    }
}

/// Resolves the client key from the peer address.
///
/// With `trust_proxy` set, the first `X-Forwarded-For` hop wins when present.
fn client_key(req: &Request<Body>, trust_proxy: bool) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| trust_proxy && !value.is_empty())
    {
        return forwarded.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Axum Middleware: fixed-window rate limiting per client address.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&req, state.config.trust_proxy);
    if let Err(err) = state.rate_limiter.check(&key, Instant::now()).await {
        tracing::warn!(client = %key, "Rate limit exceeded");
        return err.into_response();
    }
    next.run(req).await
}
