use async_trait::async_trait;
use tracing::warn;

use super::{
    IdentityProvider, NewProviderUser, ProviderError, ProviderResult, ProviderUser,
    ProviderUserUpdate, TokenClaims,
};

/// Stand-in used when no credentials were loaded. Every call reports
/// [`ProviderError::Unavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableProvider;

fn unavailable<T>(operation: &str) -> ProviderResult<T> {
    warn!("Identity provider not initialized, cannot {operation}");
    Err(ProviderError::Unavailable)
}

#[async_trait]
impl IdentityProvider for UnavailableProvider {
    fn is_available(&self) -> bool {
        false
    }

    async fn create_user(&self, _user: &NewProviderUser) -> ProviderResult<ProviderUser> {
        unavailable("create user")
    }

    async fn get_user_by_email(&self, _email: &str) -> ProviderResult<ProviderUser> {
        unavailable("get user")
    }

    async fn update_user(
        &self,
        _uid: &str,
        _update: &ProviderUserUpdate,
    ) -> ProviderResult<ProviderUser> {
        unavailable("update user")
    }

    async fn delete_user(&self, _uid: &str) -> ProviderResult<()> {
        unavailable("delete user")
    }

    async fn list_users(&self, _max_results: u32) -> ProviderResult<Vec<ProviderUser>> {
        unavailable("list users")
    }

    async fn verify_token(&self, _id_token: &str) -> ProviderResult<TokenClaims> {
        unavailable("verify token")
    }
}
