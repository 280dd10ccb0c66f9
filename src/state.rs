use std::{sync::Arc, time::Duration};

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    utils::{
        jwt::{DenyByDefault, PermissionCheck},
        mailer::Mailer,
        rate_limit::{InMemoryRateLimitStore, RateLimiter},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub mailer: Arc<dyn Mailer>,
    pub permissions: Arc<dyn PermissionCheck>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// State with the default collaborators: deny-by-default permissions and an
    /// in-process rate limit store sized from the configuration.
    pub fn new(pool: SqlitePool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        let rate_limiter = RateLimiter::new(
            Arc::new(InMemoryRateLimitStore::default()),
            Duration::from_secs(config.rate_limit_window_secs),
            config.rate_limit_max_requests,
        );
        Self {
            pool,
            config,
            mailer,
            permissions: Arc::new(DenyByDefault),
            rate_limiter,
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Mailer> {
    fn from_ref(state: &AppState) -> Self {
        state.mailer.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
