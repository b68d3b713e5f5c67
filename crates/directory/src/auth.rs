use std::{error::Error, fmt};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: User,
}

#[derive(Debug)]
pub enum AuthError {
    /// Sign-in failed. Deliberately carries no detail.
    InvalidCredentials,
    /// The token is missing, expired or was rejected.
    Unauthorized,
    NotConfigured,
    Provider(Box<dyn Error + Send + Sync>),
}

impl AuthError {
    pub fn provider<E: Into<Box<dyn Error + Send + Sync>>>(why: E) -> Self {
        Self::Provider(why.into())
    }
}

impl Error for AuthError {}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidCredentials => {
                write!(f, "Identifiants invalides ou erreur de connexion.")
            }
            Self::Unauthorized => write!(f, "not signed in"),
            Self::NotConfigured => write!(f, "the identity provider is not configured"),
            Self::Provider(why) => write!(f, "identity provider error: {}", why),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

/// The hosted service administrator accounts live in.
#[async_trait]
pub trait IdentityProvider: Clone + Send + Sync + 'static {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<Session>;

    /// The user an access token belongs to, `Unauthorized` if the token is
    /// not valid (anymore).
    async fn user(&self, access_token: &str) -> AuthResult<User>;

    async fn sign_out(&self, access_token: &str) -> AuthResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated(Session),
}

/// Per request view of the administrator's session.
pub struct AuthGateway<P: IdentityProvider> {
    provider: P,
    state: AuthState,
}

impl<P: IdentityProvider> AuthGateway<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            state: AuthState::Unauthenticated,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    /// Restores a session from a stored access token.
    pub async fn get_session(&mut self, access_token: Option<&str>) -> Option<&Session> {
        let access_token = match access_token.map(str::trim) {
            Some(token) if !token.is_empty() => token.to_owned(),
            _ => {
                self.state = AuthState::Unauthenticated;
                return None;
            }
        };

        self.state = AuthState::Authenticating;
        match self.provider.user(&access_token).await {
            Ok(user) => {
                self.state = AuthState::Authenticated(Session {
                    access_token,
                    refresh_token: None,
                    expires_at: None,
                    user,
                });
            }
            Err(AuthError::Unauthorized) => {
                log::debug!("stored session was rejected");
                self.state = AuthState::Unauthenticated;
            }
            Err(why) => {
                log::warn!("could not restore session: {}", why);
                self.state = AuthState::Unauthenticated;
            }
        }
        self.session()
    }

    /// Signs in with email and password. Every failure is reported as
    /// `InvalidCredentials`.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> AuthResult<&Session> {
        self.state = AuthState::Authenticating;
        match self
            .provider
            .sign_in_with_password(email.trim(), password)
            .await
        {
            Ok(session) => {
                log::info!("administrator {} signed in", session.user.id);
                self.state = AuthState::Authenticated(session);
                self.session().ok_or(AuthError::InvalidCredentials)
            }
            Err(why) => {
                log::warn!("sign in failed: {}", why);
                self.state = AuthState::Unauthenticated;
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Drops the local session, even when the provider could not be reached.
    pub async fn sign_out(&mut self) {
        let state = std::mem::replace(&mut self.state, AuthState::Unauthenticated);
        if let AuthState::Authenticated(session) = state {
            if let Err(why) = self.provider.sign_out(&session.access_token).await {
                log::warn!("provider sign out failed: {}", why);
            }
        }
    }
}
