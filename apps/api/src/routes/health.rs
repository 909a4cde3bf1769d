use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service version and whether the identity provider was initialized.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let provider = if state.provider.is_available() {
        "available"
    } else {
        "unavailable"
    };
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "identity-api",
        "provider": provider
    }))
}
