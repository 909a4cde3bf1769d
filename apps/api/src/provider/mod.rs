//! Identity provider client. All traffic to the external identity service goes through here.
//!
//! Every operation returns a [`ProviderResult`]. Failures are logged where they
//! happen and handed back typed; callers decide whether a failure matters.
//! Nothing here is fatal to a request.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

pub mod firebase;
pub mod unavailable;

#[cfg(test)]
pub mod fake;

pub use firebase::{FirebaseEndpoints, FirebaseProvider, ServiceAccount};
pub use unavailable::UnavailableProvider;

/// Upper bound accepted by the provider's list endpoint.
pub const MAX_LIST_RESULTS: u32 = 1000;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// No credentials were loaded at startup. Treated the same as "down".
    #[error("identity provider is not initialized")]
    Unavailable,

    /// Network, authorization, HTTP status, or payload failure.
    #[error("identity provider request failed (status {status:?}): {message}")]
    Remote { status: Option<u16>, message: String },

    #[error("invalid identity token: {0}")]
    InvalidToken(String),
}

impl ProviderError {
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        ProviderError::Remote {
            status,
            message: message.into(),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Account to create on the provider.
#[derive(Debug, Clone)]
pub struct NewProviderUser {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// Partial update; `None` leaves the attribute unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProviderUserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub display_name: Option<String>,
    pub disabled: Option<bool>,
    pub email_verified: Option<bool>,
}

/// An account as the provider reports it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub email_verified: bool,
    pub disabled: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Verified claims of a provider-issued ID token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// The provider UID.
    pub sub: String,
    pub aud: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub auth_time: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
}

impl TokenClaims {
    pub fn uid(&self) -> &str {
        &self.sub
    }
}

/// The identity provider surface used by the rest of the service.
///
/// Carried in `AppState` as `Arc<dyn IdentityProvider>`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// False when no provider could be initialized at startup.
    fn is_available(&self) -> bool;

    async fn create_user(&self, user: &NewProviderUser) -> ProviderResult<ProviderUser>;

    async fn get_user_by_email(&self, email: &str) -> ProviderResult<ProviderUser>;

    async fn update_user(
        &self,
        uid: &str,
        update: &ProviderUserUpdate,
    ) -> ProviderResult<ProviderUser>;

    async fn delete_user(&self, uid: &str) -> ProviderResult<()>;

    /// First page of accounts, at most `max_results` (capped at [`MAX_LIST_RESULTS`]).
    async fn list_users(&self, max_results: u32) -> ProviderResult<Vec<ProviderUser>>;

    async fn verify_token(&self, id_token: &str) -> ProviderResult<TokenClaims>;
}

/// Builds the process-wide provider from a service-account file.
///
/// A missing or unusable file yields an [`UnavailableProvider`]; there is no
/// later retry.
pub fn from_credentials_file(
    path: &Path,
    project_override: Option<&str>,
) -> Arc<dyn IdentityProvider> {
    if !path.exists() {
        warn!(
            "Identity provider credentials not found at: {}",
            path.display()
        );
        return Arc::new(UnavailableProvider);
    }

    info!(
        "Loading identity provider credentials from: {}",
        path.display()
    );

    let provider = ServiceAccount::from_file(path).and_then(|mut account| {
        if let Some(project_id) = project_override {
            account.project_id = project_id.to_string();
        }
        FirebaseProvider::new(account, FirebaseEndpoints::default())
    });

    match provider {
        Ok(provider) => {
            info!(
                "Identity provider initialized for project {}",
                provider.project_id()
            );
            Arc::new(provider)
        }
        Err(e) => {
            error!("Identity provider initialization error: {e:#}");
            Arc::new(UnavailableProvider)
        }
    }
}
