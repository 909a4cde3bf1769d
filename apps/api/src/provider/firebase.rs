//! Firebase Authentication over its REST APIs.
//!
//! Admin calls go to the Identity Toolkit v1 API with an OAuth2 access token
//! minted from the service account (JWT-bearer grant). ID tokens are checked
//! locally against the securetoken JWKS.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::{
    IdentityProvider, NewProviderUser, ProviderError, ProviderResult, ProviderUser,
    ProviderUserUpdate, TokenClaims, MAX_LIST_RESULTS,
};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURETOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const SCOPES: &str =
    "https://www.googleapis.com/auth/identitytoolkit https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Access tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The subset of a Google service-account key file the client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccount {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("{} is not a service-account key file", path.display()))
    }
}

/// Base URLs of the remote services.
#[derive(Debug, Clone)]
pub struct FirebaseEndpoints {
    pub identity_toolkit: String,
    pub jwks: String,
    /// Overrides the service account's `token_uri`.
    pub token: Option<String>,
}

impl Default for FirebaseEndpoints {
    fn default() -> Self {
        Self {
            identity_toolkit: IDENTITY_TOOLKIT_URL.to_string(),
            jwks: SECURETOKEN_JWKS_URL.to_string(),
            token: None,
        }
    }
}

impl FirebaseEndpoints {
    /// Every endpoint under one base URL: `/v1`, `/jwks`, `/token`.
    pub fn under(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            identity_toolkit: format!("{base}/v1"),
            jwks: format!("{base}/jwks"),
            token: Some(format!("{base}/token")),
        }
    }
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

pub struct FirebaseProvider {
    client: Client,
    project_id: String,
    client_email: String,
    private_key_id: Option<String>,
    signing_key: EncodingKey,
    token_uri: String,
    endpoints: FirebaseEndpoints,
    access_token: Mutex<Option<CachedToken>>,
}

// ── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Account record as returned by the Identity Toolkit API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecord {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    disabled: bool,
    /// Milliseconds since the epoch, as a decimal string.
    #[serde(default)]
    created_at: Option<String>,
}

impl From<AccountRecord> for ProviderUser {
    fn from(record: AccountRecord) -> Self {
        let created_at = record
            .created_at
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(DateTime::<Utc>::from_timestamp_millis);
        ProviderUser {
            uid: record.local_id,
            email: record.email,
            display_name: record.display_name,
            email_verified: record.email_verified,
            disabled: record.disabled,
            created_at,
        }
    }
}

#[derive(Deserialize)]
struct AccountList {
    #[serde(default)]
    users: Vec<AccountRecord>,
}

#[derive(Deserialize)]
struct GoogleError {
    error: GoogleErrorBody,
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

// ── Client ──────────────────────────────────────────────────────────────────

impl FirebaseProvider {
    pub fn new(account: ServiceAccount, endpoints: FirebaseEndpoints) -> Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .context("Service-account private key is not a valid RSA PEM")?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        let token_uri = endpoints
            .token
            .clone()
            .unwrap_or_else(|| account.token_uri.clone());

        Ok(Self {
            client,
            project_id: account.project_id,
            client_email: account.client_email,
            private_key_id: account.private_key_id,
            signing_key,
            token_uri,
            endpoints,
            access_token: Mutex::new(None),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn accounts_url(&self, action: &str) -> String {
        format!(
            "{}/projects/{}/accounts{}",
            self.endpoints.identity_toolkit, self.project_id, action
        )
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    /// Returns a cached access token, minting a new one when close to expiry.
    async fn access_token(&self) -> ProviderResult<String> {
        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SCOPES,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();
        let assertion = jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .map_err(|e| ProviderError::remote(None, format!("failed to sign assertion: {e}")))?;

        let request = self
            .client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())]);
        let response: AccessTokenResponse = send_json(request).await?;

        let lifetime = Duration::from_secs(response.expires_in);
        *cached = Some(CachedToken {
            value: response.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN),
        });
        debug!("Minted identity provider access token");
        Ok(response.access_token)
    }

    /// Sends an authorized admin request; failures are logged under `operation`.
    async fn admin_call<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> ProviderResult<T> {
        let result = match self.access_token().await {
            Ok(token) => send_json(request.bearer_auth(token)).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            error!("Identity provider {operation} error: {e}");
        }
        result
    }

    async fn lookup(&self, operation: &str, body: Value) -> ProviderResult<ProviderUser> {
        let request = self.client.post(self.accounts_url(":lookup")).json(&body);
        let list: AccountList = self.admin_call(operation, request).await?;
        match list.users.into_iter().next() {
            Some(record) => Ok(record.into()),
            None => {
                error!("Identity provider {operation} error: user not found");
                Err(ProviderError::remote(Some(404), "USER_NOT_FOUND"))
            }
        }
    }

    async fn decoding_key(&self, kid: &str) -> ProviderResult<DecodingKey> {
        let jwks: JwkSet = send_json(self.client.get(&self.endpoints.jwks)).await?;
        let jwk = jwks
            .keys
            .into_iter()
            .find(|k| k.kid == kid)
            .ok_or_else(|| ProviderError::InvalidToken(format!("unknown key id {kid}")))?;
        DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| ProviderError::remote(None, format!("malformed signing key: {e}")))
    }

    async fn verify(&self, id_token: &str) -> ProviderResult<TokenClaims> {
        let header = jsonwebtoken::decode_header(id_token)
            .map_err(|e| ProviderError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(ProviderError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| ProviderError::InvalidToken("missing key id".to_string()))?;
        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[self.issuer()]);
        let data = jsonwebtoken::decode::<TokenClaims>(id_token, &key, &validation)
            .map_err(|e| ProviderError::InvalidToken(e.to_string()))?;

        if data.claims.sub.is_empty() {
            return Err(ProviderError::InvalidToken("empty subject".to_string()));
        }
        Ok(data.claims)
    }
}

/// Sends a request and decodes a JSON body, mapping every failure to
/// [`ProviderError::Remote`].
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> ProviderResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::remote(None, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GoogleError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        return Err(ProviderError::remote(Some(status.as_u16()), message));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::remote(Some(status.as_u16()), format!("malformed response: {e}")))
}

#[async_trait]
impl IdentityProvider for FirebaseProvider {
    fn is_available(&self) -> bool {
        true
    }

    async fn create_user(&self, user: &NewProviderUser) -> ProviderResult<ProviderUser> {
        info!("Creating identity provider user: {}", user.email);
        let mut body = json!({
            "email": user.email,
            "password": user.password,
            "emailVerified": false,
        });
        if let Some(display_name) = &user.display_name {
            body["displayName"] = json!(display_name);
        }

        let request = self.client.post(self.accounts_url("")).json(&body);
        let record: AccountRecord = self.admin_call("user creation", request).await?;
        let created = ProviderUser::from(record);
        info!("Identity provider user created: {}", created.uid);
        Ok(created)
    }

    async fn get_user_by_email(&self, email: &str) -> ProviderResult<ProviderUser> {
        let user = self
            .lookup("user retrieval", json!({ "email": [email] }))
            .await?;
        info!("Identity provider user retrieved: {}", user.uid);
        Ok(user)
    }

    async fn update_user(
        &self,
        uid: &str,
        update: &ProviderUserUpdate,
    ) -> ProviderResult<ProviderUser> {
        let mut body = json!({ "localId": uid });
        if let Some(email) = &update.email {
            body["email"] = json!(email);
        }
        if let Some(password) = &update.password {
            body["password"] = json!(password);
        }
        if let Some(display_name) = &update.display_name {
            body["displayName"] = json!(display_name);
        }
        if let Some(disabled) = update.disabled {
            body["disableUser"] = json!(disabled);
        }
        if let Some(email_verified) = update.email_verified {
            body["emailVerified"] = json!(email_verified);
        }

        let request = self.client.post(self.accounts_url(":update")).json(&body);
        let _: Value = self.admin_call("user update", request).await?;
        info!("Identity provider user updated: {uid}");

        // The update response omits some attributes; read the account back.
        self.lookup("user update", json!({ "localId": [uid] })).await
    }

    async fn delete_user(&self, uid: &str) -> ProviderResult<()> {
        let request = self
            .client
            .post(self.accounts_url(":delete"))
            .json(&json!({ "localId": uid }));
        let _: Value = self.admin_call("user deletion", request).await?;
        info!("Identity provider user deleted: {uid}");
        Ok(())
    }

    async fn list_users(&self, max_results: u32) -> ProviderResult<Vec<ProviderUser>> {
        let max_results = max_results.clamp(1, MAX_LIST_RESULTS);
        let request = self
            .client
            .get(self.accounts_url(":batchGet"))
            .query(&[("maxResults", max_results)]);
        let list: AccountList = self.admin_call("list users", request).await?;
        let users: Vec<ProviderUser> = list.users.into_iter().map(Into::into).collect();
        info!("Retrieved {} identity provider users", users.len());
        Ok(users)
    }

    async fn verify_token(&self, id_token: &str) -> ProviderResult<TokenClaims> {
        match self.verify(id_token).await {
            Ok(claims) => {
                info!("Token verified for user: {}", claims.uid());
                Ok(claims)
            }
            Err(e) => {
                error!("Token verification error: {e}");
                Err(e)
            }
        }
    }
}
