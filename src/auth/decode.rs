//! Normalization of heterogeneous auth responses
//!
//! The backend has shipped several serializers over time. Each field the
//! client cares about is looked up through a prioritized alias list; the
//! first alias holding a non-empty value wins:
//!
//! | Field         | Aliases, in priority order      |
//! |---------------|---------------------------------|
//! | access token  | `access`, `access_token`        |
//! | refresh token | `refresh`, `refresh_token`      |
//! | user id       | `id`, `pk` (string or number)   |
//!
//! Nothing outside this module reads those raw field names.

use serde_json::{Map, Value};

use super::token::TokenPair;
use super::user::User;

/// Accepted names for the access token
pub const ACCESS_ALIASES: &[&str] = &["access", "access_token"];

/// Accepted names for the refresh token
pub const REFRESH_ALIASES: &[&str] = &["refresh", "refresh_token"];

/// Accepted names for the user id
pub const USER_ID_ALIASES: &[&str] = &["id", "pk"];

fn first_string(object: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| match object.get(*alias) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn optional_string(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Tokens found in a response; either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenGrant {
    /// Access token, if present
    pub access: Option<String>,
    /// Refresh token, if present
    pub refresh: Option<String>,
}

impl TokenGrant {
    /// Pull tokens out of a response body
    #[must_use]
    pub fn decode(body: &Value) -> Self {
        let Some(object) = body.as_object() else {
            return Self::default();
        };
        Self {
            access: first_token(object, ACCESS_ALIASES),
            refresh: first_token(object, REFRESH_ALIASES),
        }
    }

    /// Both tokens, when both are present
    #[must_use]
    pub fn pair(&self) -> Option<TokenPair> {
        match (&self.access, &self.refresh) {
            (Some(access), Some(refresh)) => Some(TokenPair::new(access, refresh)),
            _ => None,
        }
    }
}

// Tokens are opaque strings; a numeric `access` is not a token.
fn first_token(object: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| match object.get(*alias) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    })
}

/// Decode a user object. Returns `None` without a usable id.
#[must_use]
pub fn decode_user(value: &Value) -> Option<User> {
    let object = value.as_object()?;
    let id = first_string(object, USER_ID_ALIASES)?;

    Some(User {
        id,
        email: optional_string(object, "email").unwrap_or_default(),
        username: optional_string(object, "username"),
        first_name: optional_string(object, "first_name"),
        last_name: optional_string(object, "last_name"),
        is_staff: object.get("is_staff").and_then(Value::as_bool),
    })
}

/// Shape of a login response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Access and refresh tokens were issued, possibly with the user inline
    Tokens {
        /// Issued tokens
        tokens: TokenPair,
        /// Inline user object, if any
        user: Option<User>,
    },
    /// No tokens, but a user object: the backend keeps the session itself
    /// (cookie-style). Accepted without further validation.
    SessionOnly {
        /// Inline user object
        user: User,
    },
    /// Neither tokens nor a user
    Empty,
}

/// Classify a login response body
#[must_use]
pub fn decode_login(body: &Value) -> LoginOutcome {
    let user = body.get("user").and_then(decode_user);

    match (TokenGrant::decode(body).pair(), user) {
        (Some(tokens), user) => LoginOutcome::Tokens { tokens, user },
        (None, Some(user)) => LoginOutcome::SessionOnly { user },
        (None, None) => LoginOutcome::Empty,
    }
}

/// Normalized sign-up response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpResult {
    /// Tokens, only when both were issued
    pub tokens: Option<TokenPair>,
    /// The backend asked the user to verify their email first
    pub requires_verification: bool,
    /// Raw `detail` message, if any
    pub detail: Option<String>,
}

/// Decode a sign-up response body
#[must_use]
pub fn decode_sign_up(body: &Value) -> SignUpResult {
    let detail = body
        .get("detail")
        .and_then(Value::as_str)
        .map(str::to_string);
    let requires_verification = detail
        .as_deref()
        .is_some_and(|d| d.to_lowercase().contains("verification"));

    SignUpResult {
        tokens: TokenGrant::decode(body).pair(),
        requires_verification,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grant_accepts_both_naming_conventions() {
        let short = TokenGrant::decode(&json!({"access": "a", "refresh": "r"}));
        let long = TokenGrant::decode(&json!({"access_token": "a", "refresh_token": "r"}));
        assert_eq!(short, long);
        assert_eq!(short.pair(), Some(TokenPair::new("a", "r")));
    }

    #[test]
    fn test_grant_prefers_short_alias() {
        let grant = TokenGrant::decode(&json!({"access": "short", "access_token": "long"}));
        assert_eq!(grant.access.as_deref(), Some("short"));
    }

    #[test]
    fn test_grant_skips_empty_alias() {
        let grant = TokenGrant::decode(&json!({"access": "", "access_token": "long"}));
        assert_eq!(grant.access.as_deref(), Some("long"));
    }

    #[test]
    fn test_grant_ignores_non_string_tokens() {
        let grant = TokenGrant::decode(&json!({"access": 12, "refresh": null}));
        assert_eq!(grant, TokenGrant::default());
        assert_eq!(TokenGrant::decode(&json!("nope")), TokenGrant::default());
    }

    #[test]
    fn test_user_id_from_pk_number() {
        let user = decode_user(&json!({"pk": 42, "email": "p@example.com", "is_staff": true})).unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(user.email, "p@example.com");
        assert_eq!(user.is_staff, Some(true));
    }

    #[test]
    fn test_user_id_prefers_id() {
        let user = decode_user(&json!({"id": "abc", "pk": 1})).unwrap();
        assert_eq!(user.id, "abc");
        assert_eq!(user.email, "");
    }

    #[test]
    fn test_user_without_id_is_rejected() {
        assert!(decode_user(&json!({"email": "p@example.com"})).is_none());
    }

    #[test]
    fn test_login_outcomes() {
        let with_tokens = decode_login(&json!({
            "access_token": "a",
            "refresh_token": "r",
            "user": {"id": 1, "email": "p@example.com"}
        }));
        assert!(matches!(with_tokens, LoginOutcome::Tokens { user: Some(_), .. }));

        let session = decode_login(&json!({"user": {"pk": 1}}));
        assert!(matches!(session, LoginOutcome::SessionOnly { .. }));

        // A lone access token is not a usable pair
        assert_eq!(decode_login(&json!({"access": "a"})), LoginOutcome::Empty);
        assert_eq!(decode_login(&json!({"detail": "No active account"})), LoginOutcome::Empty);
    }

    #[test]
    fn test_sign_up_verification_flag() {
        let result = decode_sign_up(&json!({"detail": "Verification e-mail sent."}));
        assert!(result.requires_verification);
        assert!(result.tokens.is_none());

        let result = decode_sign_up(&json!({"access": "a", "refresh": "r"}));
        assert!(!result.requires_verification);
        assert_eq!(result.tokens, Some(TokenPair::new("a", "r")));
    }

    #[test]
    fn test_sign_up_needs_both_tokens() {
        let result = decode_sign_up(&json!({"access": "a"}));
        assert!(result.tokens.is_none());
    }
}
