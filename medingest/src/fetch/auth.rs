//! Authentication for remote downloads.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::queue::RequestOptions;

/// Supplies the current auth token, if a user is signed in.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// A token fixed at construction time.
#[derive(Debug, Clone)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// A provider that never has a token.
    pub fn none() -> Self {
        Self(None)
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// How the token is placed in request headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthHeader {
    /// `Authorization: Bearer <token>`.
    #[default]
    Bearer,
    /// `<name>: <token>`.
    Custom(String),
}

impl AuthHeader {
    /// Header name and value for a token.
    pub fn header(&self, token: &str) -> (String, String) {
        match self {
            AuthHeader::Bearer => ("Authorization".to_string(), format!("Bearer {}", token)),
            AuthHeader::Custom(name) => (name.clone(), token.to_string()),
        }
    }
}

impl fmt::Display for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthHeader::Bearer => write!(f, "bearer"),
            AuthHeader::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for AuthHeader {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("auth header must not be empty".to_string());
        }
        if s.eq_ignore_ascii_case("bearer") {
            Ok(AuthHeader::Bearer)
        } else {
            Ok(AuthHeader::Custom(s.to_string()))
        }
    }
}

/// Request options with the auth header merged in when required.
///
/// A required token that is not available is logged and the request goes out
/// without it.
pub fn authorized_options(
    options: &RequestOptions,
    requires_auth_token: bool,
    scheme: &AuthHeader,
    provider: Option<&dyn TokenProvider>,
) -> RequestOptions {
    let mut options = options.clone();
    if !requires_auth_token {
        return options;
    }

    match provider.and_then(|p| p.token()) {
        Some(token) => {
            let (name, value) = scheme.header(&token);
            options.headers.insert(name, value);
        }
        None => warn!("Auth token required but not available, requesting without it"),
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header() {
        let (name, value) = AuthHeader::Bearer.header("abc");
        assert_eq!(name, "Authorization");
        assert_eq!(value, "Bearer abc");
    }

    #[test]
    fn test_custom_header() {
        let scheme: AuthHeader = "Girder-Token".parse().unwrap();
        assert_eq!(scheme.header("abc"), ("Girder-Token".to_string(), "abc".to_string()));
        assert_eq!(scheme.to_string(), "Girder-Token");
    }

    #[test]
    fn test_parse_bearer_case_insensitive() {
        assert_eq!("Bearer".parse::<AuthHeader>().unwrap(), AuthHeader::Bearer);
        assert!("  ".parse::<AuthHeader>().is_err());
    }

    #[test]
    fn test_authorized_options_merges_token() {
        let base = RequestOptions::default().with_header("Accept", "*/*");
        let token = StaticToken::new("abc");

        let options = authorized_options(&base, true, &AuthHeader::Bearer, Some(&token));
        assert_eq!(options.headers["Authorization"], "Bearer abc");
        assert_eq!(options.headers["Accept"], "*/*");
    }

    #[test]
    fn test_authorized_options_not_required() {
        let token = StaticToken::new("abc");
        let options = authorized_options(
            &RequestOptions::default(),
            false,
            &AuthHeader::Bearer,
            Some(&token),
        );
        assert!(options.headers.is_empty());
    }

    #[test]
    fn test_authorized_options_missing_token() {
        let token = StaticToken::none();
        let options = authorized_options(
            &RequestOptions::default(),
            true,
            &AuthHeader::Bearer,
            Some(&token),
        );
        assert!(options.headers.is_empty());
    }
}
