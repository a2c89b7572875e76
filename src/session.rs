//! Authentication session as seen by the profile page.
//!
//! The identity provider owns the session lifecycle; this crate only reads
//! it. Bearer tokens come from an injected [`TokenProvider`] instead of an
//! ambient provider hook.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};

// =============================================================================
// SESSION
// =============================================================================

/// Identity fields reported by the provider for the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Snapshot of the identity provider's session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub user: Option<SessionUser>,
}

impl Session {
    /// Session that is still resolving.
    #[must_use]
    pub fn loading() -> Self {
        Self { is_authenticated: false, is_loading: true, user: None }
    }

    /// Signed-out session.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Signed-in session for `user`.
    #[must_use]
    pub fn authenticated(user: SessionUser) -> Self {
        Self { is_authenticated: true, is_loading: false, user: Some(user) }
    }

    /// True once the provider has finished loading and reports a login.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.is_authenticated && !self.is_loading
    }
}

// =============================================================================
// PAGE STATE
// =============================================================================

/// Page-level state derived from a [`Session`].
///
/// Only `Authenticated` permits network side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    Loading,
    Unauthenticated,
    Authenticated(SessionUser),
}

impl From<&Session> for PageState {
    fn from(session: &Session) -> Self {
        if session.is_loading {
            return Self::Loading;
        }
        match (&session.user, session.is_authenticated) {
            (Some(user), true) => Self::Authenticated(user.clone()),
            _ => Self::Unauthenticated,
        }
    }
}

// =============================================================================
// TOKEN PROVIDER
// =============================================================================

/// Errors produced while acquiring a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// No token is available for the current session.
    #[error("no access token available")]
    Unavailable,

    /// The provider failed to produce a token.
    #[error("token provider failed: {0}")]
    Provider(String),
}

/// Source of short-lived bearer tokens for the signed-in session.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtain a bearer token, suspending while the provider resolves it.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] if no token can be produced.
    async fn access_token(&self) -> Result<String, TokenError>;
}

/// Token provider backed by a fixed, pre-issued token.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self { token: token.filter(|t| !t.trim().is_empty()) }
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, TokenError> {
        self.token.clone().ok_or(TokenError::Unavailable)
    }
}
