use std::net::SocketAddr;
use std::path::Path;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use identity_api::config::Config;
use identity_api::db::create_pool;
use identity_api::provider;
use identity_api::routes::build_router;
use identity_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting identity API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite (migrations run on connect)
    let db = create_pool(&config.database_url).await?;

    // Initialize the identity provider once; unavailable if credentials are missing
    let provider = provider::from_credentials_file(
        Path::new(&config.firebase_credentials_path),
        config.firebase_project_id.as_deref(),
    );
    info!(
        "Identity provider {}",
        if provider.is_available() {
            "available"
        } else {
            "unavailable; signups will skip provider registration"
        }
    );

    let state = AppState { db, provider };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
