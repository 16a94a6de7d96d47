//! Session capability: supplies and refreshes the access credential.
//!
//! The concrete login flow (OAuth password grant, JWT bearer, ...) lives behind
//! [`Session`]; the client only reads the current token and asks for a login.

use async_trait::async_trait;
use std::fmt;
use std::sync::RwLock;

/// Opaque access credential.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

impl From<&str> for Token {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

impl From<String> for Token {
    fn from(v: String) -> Self {
        Self(v)
    }
}

/// Login failure reported by a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("network failure during login: {0}")]
    Network(String),

    #[error("login failed: {0}")]
    Other(String),
}

/// Source of access tokens.
///
/// Implementations own any retry policy; the client calls [`Session::login`]
/// at most once per `start()` and never retries it.
#[async_trait]
pub trait Session: Send + Sync {
    /// Current token, if the session is authenticated.
    fn access_token(&self) -> Option<Token>;

    /// Authenticate, optionally replacing `current`, and return the new token.
    async fn login(&self, current: Option<Token>) -> Result<Token, AuthError>;
}

/// Session backed by a fixed token, for pre-authenticated deployments and tools.
///
/// `login` returns the configured token; an empty session fails every login.
#[derive(Default)]
pub struct StaticTokenSession {
    configured: Option<Token>,
    current: RwLock<Option<Token>>,
}

impl StaticTokenSession {
    /// A session that is already authenticated with `token`.
    pub fn new(token: impl Into<Token>) -> Self {
        let token = token.into();
        Self {
            configured: Some(token.clone()),
            current: RwLock::new(Some(token)),
        }
    }

    /// A session that holds `token` but only exposes it after `login`.
    pub fn unauthenticated(token: impl Into<Token>) -> Self {
        Self {
            configured: Some(token.into()),
            current: RwLock::new(None),
        }
    }
}

#[async_trait]
impl Session for StaticTokenSession {
    fn access_token(&self) -> Option<Token> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn login(&self, _current: Option<Token>) -> Result<Token, AuthError> {
        let token = self
            .configured
            .clone()
            .ok_or_else(|| AuthError::InvalidCredentials("no token configured".into()))?;
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(token.clone());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::new("00Dxx0000001gPL!AR8AQJXg5oj");
        assert_eq!(format!("{:?}", token), "Token(***)");
        assert_eq!(token.as_str(), "00Dxx0000001gPL!AR8AQJXg5oj");
    }

    #[tokio::test]
    async fn test_static_session_authenticated() {
        let session = StaticTokenSession::new("abc");
        assert_eq!(session.access_token(), Some(Token::new("abc")));
        assert_eq!(session.login(None).await, Ok(Token::new("abc")));
    }

    #[tokio::test]
    async fn test_static_session_login_exposes_token() {
        let session = StaticTokenSession::unauthenticated("abc");
        assert!(session.access_token().is_none());
        session.login(None).await.unwrap();
        assert_eq!(session.access_token(), Some(Token::new("abc")));
    }

    #[tokio::test]
    async fn test_empty_session_fails_login() {
        let session = StaticTokenSession::default();
        let err = session.login(None).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
        assert!(session.access_token().is_none());
    }
}
