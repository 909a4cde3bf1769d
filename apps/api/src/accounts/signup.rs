use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::accounts::validation::{validate_signup, SignupRequest, ValidSignup};
use crate::errors::AppError;
use crate::models::user::User;
use crate::password::hash_password_blocking;
use crate::provider::{IdentityProvider, NewProviderUser, ProviderError};
use crate::store::users::{self, NewUser};
use crate::store::{is_unique_violation, tokens};

const DUPLICATE_EMAIL: &str = "user with this email already exists.";

/// Outcome of the identity provider half of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FirebaseStatus {
    /// The provider account exists and its UID is stored locally.
    Success,
    /// No provider is configured; nothing was attempted.
    Skipped,
    /// The provider call failed; the local account was kept anyway.
    Failed,
}

#[derive(Debug)]
pub struct Registration {
    pub user: User,
    pub token: String,
    pub firebase_status: FirebaseStatus,
}

fn duplicate_email() -> AppError {
    AppError::validation("email", DUPLICATE_EMAIL)
}

/// Registers a user locally and, best-effort, with the identity provider.
///
/// Local validation and uniqueness failures abort before the provider is
/// called. The user row and its token are committed before the provider is
/// contacted, so provider failures never remove the local account.
pub async fn register(
    pool: &SqlitePool,
    provider: &dyn IdentityProvider,
    request: &SignupRequest,
) -> Result<Registration, AppError> {
    let valid = validate_signup(request)?;

    if users::find_by_email(pool, &valid.email).await?.is_some() {
        warn!("Signup rejected, email already registered: {}", valid.email);
        return Err(duplicate_email());
    }

    let password_hash = hash_password_blocking(valid.password.clone())
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let (user, token) = create_local_account(pool, &valid, &password_hash).await?;
    let (user, firebase_status) = link_provider_account(pool, provider, &valid, user).await;

    info!(
        "Registered user {} ({}), provider status {:?}",
        user.id, user.email, firebase_status
    );

    Ok(Registration {
        user,
        token,
        firebase_status,
    })
}

/// Inserts the user and issues its token in one short transaction.
async fn create_local_account(
    pool: &SqlitePool,
    valid: &ValidSignup,
    password_hash: &str,
) -> Result<(User, String), AppError> {
    let mut tx = pool.begin().await?;

    let inserted = users::insert(
        &mut *tx,
        NewUser {
            email: &valid.email,
            first_name: &valid.first_name,
            last_name: &valid.last_name,
            user_type: valid.user_type,
            password_hash,
        },
    )
    .await;
    let user = match inserted {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            warn!("Signup lost a race on email: {}", valid.email);
            return Err(duplicate_email());
        }
        Err(e) => return Err(e.into()),
    };

    let token = tokens::get_or_create(&mut *tx, user.id).await?;
    tx.commit().await?;
    Ok((user, token))
}

/// Creates the provider account and stores its UID. Runs with no transaction
/// open; every failure is downgraded to a status.
async fn link_provider_account(
    pool: &SqlitePool,
    provider: &dyn IdentityProvider,
    valid: &ValidSignup,
    user: User,
) -> (User, FirebaseStatus) {
    if !provider.is_available() {
        warn!("Identity provider not initialized, skipping provider user creation");
        return (user, FirebaseStatus::Skipped);
    }

    let new_provider_user = NewProviderUser {
        email: valid.email.clone(),
        password: valid.password.clone(),
        display_name: Some(valid.display_name()),
    };
    let created = match provider.create_user(&new_provider_user).await {
        Ok(created) => created,
        Err(ProviderError::Unavailable) => {
            warn!("Identity provider became unavailable, skipping provider user creation");
            return (user, FirebaseStatus::Skipped);
        }
        Err(e) => {
            warn!("Provider user creation failed for {}: {e}", user.email);
            return (user, FirebaseStatus::Failed);
        }
    };

    match users::attach_firebase_uid(pool, user.id, &created.uid).await {
        Ok(updated) => {
            info!(
                "User {} created in both the local store and the identity provider",
                updated.email
            );
            (updated, FirebaseStatus::Success)
        }
        Err(e) if is_unique_violation(&e) => {
            warn!(
                "Provider UID {} already belongs to another local user; {} kept without it",
                created.uid, user.email
            );
            (user, FirebaseStatus::Failed)
        }
        Err(e) => {
            error!(
                "Failed to store provider UID {} for {}: {e}",
                created.uid, user.email
            );
            (user, FirebaseStatus::Failed)
        }
    }
}
