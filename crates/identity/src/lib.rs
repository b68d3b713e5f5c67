use std::{env, error, fmt, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use directory::auth::{AuthError, AuthResult, IdentityProvider, Session, User};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, Clone)]
pub enum IdentityError {
    RequestError(Arc<reqwest::Error>),
    JsonError(Arc<serde_json::Error>),
    InvalidResponse {
        status_code: StatusCode,
        url: String,
        response: Option<String>,
    },
    NotConfigured,
}

impl error::Error for IdentityError {}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IdentityError::RequestError(e) => write!(f, "HTTP request error: {}", e),
            IdentityError::JsonError(e) => write!(f, "JSON parse error: {}", e),
            IdentityError::InvalidResponse {
                status_code,
                url,
                response,
            } => match response {
                Some(text) => {
                    write!(f, "Invalid Response ({}) {}: {}", status_code, text, url)
                }
                None => write!(f, "Invalid Response ({}) {}", status_code, url),
            },
            IdentityError::NotConfigured => write!(f, "identity provider is not configured"),
        }
    }
}

impl From<reqwest::Error> for IdentityError {
    fn from(e: reqwest::Error) -> Self {
        IdentityError::RequestError(Arc::new(e))
    }
}

impl From<serde_json::Error> for IdentityError {
    fn from(e: serde_json::Error) -> Self {
        IdentityError::JsonError(Arc::new(e))
    }
}

impl From<IdentityError> for AuthError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::NotConfigured => AuthError::NotConfigured,
            IdentityError::InvalidResponse { status_code, .. }
                if status_code == StatusCode::UNAUTHORIZED
                    || status_code == StatusCode::FORBIDDEN =>
            {
                AuthError::Unauthorized
            }
            other => AuthError::provider(other),
        }
    }
}

/// Where the identity service lives and the public key identifying this
/// project to it.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub url: String,
    pub api_key: String,
}

impl IdentityConfig {
    pub fn from_env() -> Option<Self> {
        let url = env::var("IDENTITY_URL").ok()?;
        let api_key = env::var("IDENTITY_API_KEY").ok()?;
        Some(Self::new(url, api_key))
    }

    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    email: Option<String>,
}

impl From<UserResponse> for User {
    fn from(user: UserResponse) -> Self {
        User {
            id: user.id,
            email: user.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    /// Unix timestamp in seconds.
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: UserResponse,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => Utc.timestamp_opt(at, 0).single(),
            (None, Some(seconds)) => Some(now + chrono::Duration::seconds(seconds)),
            (None, None) => None,
        };
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into(),
        }
    }
}

/// Password based sign in against a hosted GoTrue compatible auth service.
/// Without configuration every call fails with `NotConfigured`.
#[derive(Clone)]
pub struct HostedIdentityProvider {
    client: reqwest::Client,
    config: Option<Arc<IdentityConfig>>,
}

impl HostedIdentityProvider {
    pub fn new(config: Option<IdentityConfig>) -> Self {
        if config.is_none() {
            log::warn!("IDENTITY_URL or IDENTITY_API_KEY missing, admin sign in is disabled");
        }
        Self {
            client: reqwest::Client::new(),
            config: config.map(Arc::new),
        }
    }

    pub fn from_env() -> Self {
        Self::new(IdentityConfig::from_env())
    }

    fn config(&self) -> Result<&IdentityConfig, IdentityError> {
        self.config.as_deref().ok_or(IdentityError::NotConfigured)
    }

    async fn send<T: DeserializeOwned>(
        request: reqwest::RequestBuilder,
        url: String,
    ) -> Result<Option<T>, IdentityError> {
        let response = request.send().await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => {
                Ok(Some(serde_json::from_str(&response.text().await?)?))
            }
            other => Err(IdentityError::InvalidResponse {
                status_code: other,
                url,
                response: response.text().await.ok(),
            }),
        }
    }

    async fn password_grant(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let config = self.config()?;
        let url = format!("{}/auth/v1/token?grant_type=password", config.url);
        let request = self
            .client
            .post(&url)
            .header("apikey", &config.api_key)
            .json(&PasswordGrant { email, password });

        let token: Option<TokenResponse> = Self::send(request, url.clone()).await?;
        token
            .map(|token| token.into_session(Utc::now()))
            .ok_or(IdentityError::InvalidResponse {
                status_code: StatusCode::NO_CONTENT,
                url,
                response: None,
            })
    }

    async fn fetch_user(&self, access_token: &str) -> Result<User, IdentityError> {
        let config = self.config()?;
        let url = format!("{}/auth/v1/user", config.url);
        let request = self
            .client
            .get(&url)
            .header("apikey", &config.api_key)
            .bearer_auth(access_token);

        let user: Option<UserResponse> = Self::send(request, url.clone()).await?;
        user.map(User::from).ok_or(IdentityError::InvalidResponse {
            status_code: StatusCode::NO_CONTENT,
            url,
            response: None,
        })
    }

    async fn logout(&self, access_token: &str) -> Result<(), IdentityError> {
        let config = self.config()?;
        let url = format!("{}/auth/v1/logout", config.url);
        let request = self
            .client
            .post(&url)
            .header("apikey", &config.api_key)
            .bearer_auth(access_token);

        Self::send::<serde_json::Value>(request, url).await.map(|_| ())
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentityProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<Session> {
        Ok(self.password_grant(email, password).await?)
    }

    async fn user(&self, access_token: &str) -> AuthResult<User> {
        Ok(self.fetch_user(access_token).await?)
    }

    async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        Ok(self.logout(access_token).await?)
    }
}
