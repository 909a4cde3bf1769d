//! In-process provider double for tests. Records every call it receives.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::{
    IdentityProvider, NewProviderUser, ProviderError, ProviderResult, ProviderUser,
    ProviderUserUpdate, TokenClaims,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeMode {
    /// Reports itself available and answers every call successfully.
    Healthy,
    /// Reports itself available but every call fails remotely.
    Failing,
    /// Behaves like a provider with no credentials.
    Unavailable,
}

pub struct FakeProvider {
    mode: FakeMode,
    calls: Mutex<Vec<String>>,
    /// `id_token -> uid` pairs accepted by `verify_token`.
    id_tokens: Mutex<Vec<(String, String)>>,
    /// Applied to `create_user` before it answers.
    delay: Option<Duration>,
}

impl FakeProvider {
    pub fn new(mode: FakeMode) -> Self {
        Self {
            mode,
            calls: Mutex::new(Vec::new()),
            id_tokens: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn accept_id_token(&self, id_token: &str, uid: &str) {
        self.id_tokens
            .lock()
            .unwrap()
            .push((id_token.to_string(), uid.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> ProviderResult<()> {
        self.calls.lock().unwrap().push(call);
        match self.mode {
            FakeMode::Healthy => Ok(()),
            FakeMode::Failing => Err(ProviderError::remote(Some(503), "UNAVAILABLE")),
            FakeMode::Unavailable => Err(ProviderError::Unavailable),
        }
    }
}

pub fn uid_for(email: &str) -> String {
    format!("fake-{email}")
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn is_available(&self) -> bool {
        self.mode != FakeMode::Unavailable
    }

    async fn create_user(&self, user: &NewProviderUser) -> ProviderResult<ProviderUser> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.record(format!("create:{}", user.email))?;
        Ok(ProviderUser {
            uid: uid_for(&user.email),
            email: Some(user.email.clone()),
            display_name: user.display_name.clone(),
            email_verified: false,
            disabled: false,
            created_at: Some(Utc::now()),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> ProviderResult<ProviderUser> {
        self.record(format!("get:{email}"))?;
        Ok(ProviderUser {
            uid: uid_for(email),
            email: Some(email.to_string()),
            display_name: None,
            email_verified: false,
            disabled: false,
            created_at: None,
        })
    }

    async fn update_user(
        &self,
        uid: &str,
        update: &ProviderUserUpdate,
    ) -> ProviderResult<ProviderUser> {
        self.record(format!("update:{uid}"))?;
        Ok(ProviderUser {
            uid: uid.to_string(),
            email: update.email.clone(),
            display_name: update.display_name.clone(),
            email_verified: update.email_verified.unwrap_or(false),
            disabled: update.disabled.unwrap_or(false),
            created_at: None,
        })
    }

    async fn delete_user(&self, uid: &str) -> ProviderResult<()> {
        self.record(format!("delete:{uid}"))
    }

    async fn list_users(&self, max_results: u32) -> ProviderResult<Vec<ProviderUser>> {
        self.record(format!("list:{max_results}"))?;
        Ok(Vec::new())
    }

    async fn verify_token(&self, id_token: &str) -> ProviderResult<TokenClaims> {
        self.record("verify".to_string())?;
        let uid = self
            .id_tokens
            .lock()
            .unwrap()
            .iter()
            .find(|(token, _)| token == id_token)
            .map(|(_, uid)| uid.clone())
            .ok_or_else(|| ProviderError::InvalidToken("unknown token".to_string()))?;
        let now = Utc::now().timestamp();
        Ok(TokenClaims {
            sub: uid,
            aud: "fake".to_string(),
            iss: "https://securetoken.google.com/fake".to_string(),
            iat: now,
            exp: now + 3600,
            auth_time: None,
            email: None,
            email_verified: None,
        })
    }
}
