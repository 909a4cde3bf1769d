use anyhow::{Context, Result};

const DEFAULT_CREDENTIALS_PATH: &str = "firebase-credentials.json";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Service-account JSON for the identity provider. A missing file leaves the
    /// provider unavailable for the life of the process.
    pub firebase_credentials_path: String,
    /// Overrides the `project_id` found in the credentials file.
    pub firebase_project_id: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            firebase_credentials_path: std::env::var("FIREBASE_CREDENTIALS_PATH")
                .unwrap_or_else(|_| DEFAULT_CREDENTIALS_PATH.to_string()),
            firebase_project_id: std::env::var("FIREBASE_PROJECT_ID")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
