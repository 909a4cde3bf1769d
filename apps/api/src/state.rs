use std::sync::Arc;

use sqlx::SqlitePool;

use crate::provider::IdentityProvider;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Identity provider chosen at startup; an unavailable stand-in when no
    /// credentials were found.
    pub provider: Arc<dyn IdentityProvider>,
}
