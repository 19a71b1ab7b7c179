//! Shared application state handed to every handler.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, db::DbPool, services::auth_service::JwtKeys};

/// State shared by all routes.
///
/// Handlers extract just the part they need (`State<DbPool>`,
/// `State<Arc<JwtKeys>>`) through the `FromRef` impls below.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        let jwt = Arc::new(JwtKeys::from_config(&config));
        Self {
            pool,
            config: Arc::new(config),
            jwt,
        }
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<JwtKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
