//! Bearer token held by an authenticated session.
//!
//! A [`BearerToken`] is what every call against the site carries in its
//! `Authorization` header. Tokens obtained from an API refresh token carry
//! the expiry reported by the site; tokens obtained with a user and password
//! expire after the configured session TTL.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// How a bearer token was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Exchanged from an API refresh token at the OAuth endpoint
    ApiToken,
    /// Issued by a user/password session login
    Session,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiToken => write!(f, "api-token"),
            Self::Session => write!(f, "session"),
        }
    }
}

/// Short-lived credential used to authenticate API calls.
///
/// The token string is never rendered by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    token: String,
    kind: TokenKind,
    issued_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl BearerToken {
    /// Creates a token valid for `ttl` from now.
    ///
    /// A `ttl` too large to represent as a point in time yields a token with
    /// no known expiry.
    pub fn new(token: impl Into<String>, kind: TokenKind, ttl: std::time::Duration) -> Self {
        let now = Utc::now();
        let expires_at = Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl));

        Self {
            token: token.into(),
            kind,
            issued_at: now,
            expires_at,
        }
    }

    /// Creates a token with no known expiry.
    pub fn non_expiring(token: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            token: token.into(),
            kind,
            issued_at: Utc::now(),
            expires_at: None,
        }
    }

    /// Creates a token with an explicit expiry time.
    pub fn from_token_and_expiry(
        token: impl Into<String>,
        kind: TokenKind,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: token.into(),
            kind,
            issued_at: Utc::now(),
            expires_at: Some(expires_at),
        }
    }

    /// Raw token value.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// How the token was obtained.
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// When the token was obtained.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// When the token expires, if known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns true once the expiry time has passed.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Utc::now() >= exp)
    }

    /// Returns true if the token expires within `buffer` from now.
    pub fn expires_within(&self, buffer: std::time::Duration) -> bool {
        let Some(exp) = self.expires_at else {
            return false;
        };
        let now = Utc::now();
        match Duration::from_std(buffer).ok().and_then(|b| now.checked_add_signed(b)) {
            Some(deadline) => deadline >= exp,
            None => true,
        }
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("token", &"<redacted>")
            .field("kind", &self.kind)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[test]
    fn test_token_creation() {
        let token = BearerToken::new("abc", TokenKind::Session, StdDuration::from_secs(3600));

        assert_eq!(token.token(), "abc");
        assert_eq!(token.kind(), TokenKind::Session);
        assert!(!token.is_expired());
        assert!(!token.expires_within(StdDuration::from_secs(60)));
        assert_eq!(token.authorization_header(), "Bearer abc");
    }

    #[tokio::test]
    async fn test_token_expiry() {
        let token = BearerToken::new("abc", TokenKind::Session, StdDuration::from_millis(1));

        tokio::time::sleep(StdDuration::from_millis(10)).await;
        assert!(token.is_expired());
    }

    #[test]
    fn test_expires_within_buffer() {
        let token = BearerToken::new("abc", TokenKind::ApiToken, StdDuration::from_secs(30));

        assert!(!token.is_expired());
        assert!(token.expires_within(StdDuration::from_secs(60)));
    }

    #[test]
    fn test_non_expiring_token() {
        let token = BearerToken::non_expiring("abc", TokenKind::ApiToken);

        assert!(!token.is_expired());
        assert!(!token.expires_within(StdDuration::from_secs(86400 * 365)));
        assert!(token.expires_at().is_none());
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let token = BearerToken::new(
            "abc",
            TokenKind::Session,
            StdDuration::from_secs(10_000_000_000_000),
        );
        assert!(token.expires_at().is_none());
        assert!(!token.is_expired());

        let token = BearerToken::new("abc", TokenKind::Session, StdDuration::MAX);
        assert!(token.expires_at().is_none());
    }

    #[test]
    fn test_expires_within_huge_buffer() {
        let token = BearerToken::new("abc", TokenKind::Session, StdDuration::from_secs(3600));
        assert!(token.expires_within(StdDuration::MAX));
    }

    #[test]
    fn test_debug_redacts_token() {
        let token = BearerToken::non_expiring("super-secret", TokenKind::Session);
        let rendered = format!("{:?}", token);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("Session"));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(TokenKind::ApiToken.to_string(), "api-token");
        assert_eq!(TokenKind::Session.to_string(), "session");
    }
}
