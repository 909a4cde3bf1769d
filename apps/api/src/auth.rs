//! Request authentication.
//!
//! Accepts `Authorization: Token <key>` for locally issued bearer tokens, and
//! `Authorization: Bearer <credential>` for either a local key or an identity
//! provider ID token.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use sqlx::SqlitePool;
use tracing::debug;

use crate::errors::AppError;
use crate::models::user::User;
use crate::provider::IdentityProvider;
use crate::state::AppState;
use crate::store::{tokens, users};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential<'a> {
    Token(&'a str),
    Bearer(&'a str),
}

impl<'a> Credential<'a> {
    pub fn value(&self) -> &'a str {
        match self {
            Credential::Token(v) | Credential::Bearer(v) => v,
        }
    }
}

/// Parses an `Authorization` header value. Scheme names are case-insensitive.
pub fn parse_authorization(header: &str) -> Option<Credential<'_>> {
    let (scheme, value) = header.trim().split_once(' ')?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("token") {
        Some(Credential::Token(value))
    } else if scheme.eq_ignore_ascii_case("bearer") {
        Some(Credential::Bearer(value))
    } else {
        None
    }
}

/// Resolves a credential to an active local user.
pub async fn resolve_user(
    pool: &SqlitePool,
    provider: &dyn IdentityProvider,
    credential: Credential<'_>,
) -> Result<User, AppError> {
    if let Some(user) = tokens::find_user_by_key(pool, credential.value()).await? {
        return active(user);
    }

    let Credential::Bearer(id_token) = credential else {
        return Err(AppError::Unauthorized);
    };
    if !provider.is_available() {
        return Err(AppError::Unauthorized);
    }

    let claims = provider
        .verify_token(id_token)
        .await
        .map_err(|_| AppError::Unauthorized)?;
    match users::find_by_firebase_uid(pool, claims.uid()).await? {
        Some(user) => active(user),
        None => {
            debug!("Verified ID token has no local account");
            Err(AppError::Unauthorized)
        }
    }
}

fn active(user: User) -> Result<User, AppError> {
    if user.is_active {
        Ok(user)
    } else {
        Err(AppError::Unauthorized)
    }
}

/// The caller of an authenticated route. Use
/// `Result<AuthenticatedUser, AppError>` where anonymous callers are allowed,
/// treating only [`AppError::Unauthorized`] as anonymous.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        let credential = parse_authorization(header).ok_or(AppError::Unauthorized)?;
        let user = resolve_user(&state.db, state.provider.as_ref(), credential).await?;
        Ok(AuthenticatedUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::user::UserRole;
    use crate::provider::fake::{FakeMode, FakeProvider};
    use crate::store::users::NewUser;

    async fn seed(pool: &SqlitePool, uid: Option<&str>) -> (User, String) {
        let user = users::insert(
            pool,
            NewUser {
                email: "auth@x.com",
                first_name: "Au",
                last_name: "Th",
                user_type: UserRole::User,
                password_hash: "$argon2id$stub",
            },
        )
        .await
        .unwrap();
        if let Some(uid) = uid {
            users::attach_firebase_uid(pool, user.id, uid).await.unwrap();
        }
        let mut conn = pool.acquire().await.unwrap();
        let key = tokens::get_or_create(&mut conn, user.id).await.unwrap();
        (user, key)
    }

    #[test]
    fn test_parse_authorization() {
        assert_eq!(parse_authorization("Token abc"), Some(Credential::Token("abc")));
        assert_eq!(parse_authorization("bearer  xyz "), Some(Credential::Bearer("xyz")));
        assert_eq!(parse_authorization("Basic dXNlcg=="), None);
        assert_eq!(parse_authorization("Token "), None);
        assert_eq!(parse_authorization("abc"), None);
    }

    #[tokio::test]
    async fn test_local_token_resolves_under_both_schemes() {
        let pool = test_pool().await;
        let (user, key) = seed(&pool, None).await;
        let provider = FakeProvider::new(FakeMode::Healthy);

        let via_token = resolve_user(&pool, &provider, Credential::Token(&key)).await.unwrap();
        let via_bearer = resolve_user(&pool, &provider, Credential::Bearer(&key)).await.unwrap();
        assert_eq!(via_token.id, user.id);
        assert_eq!(via_bearer.id, user.id);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_provider_id_token_resolves_linked_user() {
        let pool = test_pool().await;
        let (user, _) = seed(&pool, Some("uid-linked")).await;
        let provider = FakeProvider::new(FakeMode::Healthy);
        provider.accept_id_token("id-token-1", "uid-linked");

        let resolved = resolve_user(&pool, &provider, Credential::Bearer("id-token-1"))
            .await
            .unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn test_unknown_credentials_are_unauthorized() {
        let pool = test_pool().await;
        seed(&pool, None).await;
        let provider = FakeProvider::new(FakeMode::Healthy);

        let token_scheme = resolve_user(&pool, &provider, Credential::Token("nope")).await;
        assert!(matches!(token_scheme, Err(AppError::Unauthorized)));
        // Only the Bearer scheme falls through to the provider.
        assert!(provider.calls().is_empty());

        let bearer = resolve_user(&pool, &provider, Credential::Bearer("nope")).await;
        assert!(matches!(bearer, Err(AppError::Unauthorized)));
        assert_eq!(provider.calls(), vec!["verify".to_string()]);
    }

    #[tokio::test]
    async fn test_inactive_user_is_unauthorized() {
        let pool = test_pool().await;
        let (_, key) = seed(&pool, None).await;
        sqlx::query("UPDATE users SET is_active = 0")
            .execute(&pool)
            .await
            .unwrap();
        let provider = FakeProvider::new(FakeMode::Unavailable);
        let result = resolve_user(&pool, &provider, Credential::Token(&key)).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
