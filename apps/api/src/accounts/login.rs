use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::accounts::validation::normalize_email;
use crate::errors::{AppError, FieldErrors, NON_FIELD_ERRORS};
use crate::models::user::User;
use crate::password::verify_password_blocking;
use crate::store::{tokens, users};

/// Same message for unknown email, wrong password, and inactive account.
pub const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub token: String,
}

fn invalid_credentials() -> AppError {
    AppError::validation(NON_FIELD_ERRORS, INVALID_CREDENTIALS)
}

/// Checks the password against the local store only; the identity provider
/// is not consulted.
pub async fn authenticate(pool: &SqlitePool, request: &LoginRequest) -> Result<Session, AppError> {
    let mut errors = FieldErrors::new();
    let email = normalize_email(&request.email);
    if email.is_empty() {
        errors.add("email", "This field is required.");
    }
    if request.password.is_empty() {
        errors.add("password", "This field is required.");
    }
    errors.into_result()?;

    let Some(user) = users::find_by_email(pool, &email).await? else {
        warn!("Login failed: no account for submitted email");
        return Err(invalid_credentials());
    };

    let matches = verify_password_blocking(request.password.clone(), user.password_hash.clone())
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    if !matches || !user.is_active {
        warn!("Login failed for user {}", user.id);
        return Err(invalid_credentials());
    }

    let mut conn = pool.acquire().await?;
    let user = users::record_login(&mut *conn, user.id).await?;
    let token = tokens::get_or_create(&mut *conn, user.id).await?;

    info!("User {} logged in", user.id);
    Ok(Session { user, token })
}
