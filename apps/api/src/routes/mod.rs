pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::accounts::handlers;
use crate::state::AppState;

fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(handlers::handle_signup))
        .route("/login", post(handlers::handle_login))
        .route("/logout", post(handlers::handle_logout))
        .route("/profile", get(handlers::handle_profile))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .merge(account_routes())
        .nest("/api/auth", account_routes())
        .with_state(state)
}
