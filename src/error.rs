//! Error types for the Skyshot API client
//!
//! Every fallible operation in the crate returns [`ApiError`]. Errors that reach
//! UI code should be rendered through [`format_error_message`], which always
//! yields a single flat, human-readable string.

use std::time::Duration;

use thiserror::Error;

use crate::storage::StorageError;
use crate::utils::{flatten_error_messages, looks_like_html};

/// Main error type for the Skyshot API client
#[derive(Error, Debug)]
pub enum ApiError {
    /// No response was received (DNS failure, connection refused, TLS error)
    #[error("Network error: {0}")]
    Network(String),

    /// The request exceeded the configured timeout
    #[error(
        "Request timed out after {timeout:?}: {method} {endpoint}\nSuggestion: check your connection and try again"
    )]
    Timeout {
        /// HTTP method of the request
        method: String,
        /// Endpoint path of the request
        endpoint: String,
        /// Timeout that elapsed
        timeout: Duration,
    },

    /// The backend answered with a non-success status
    #[error("Request failed with status {status} ({method} {endpoint}){}", render_messages(.messages))]
    Http {
        /// HTTP status code
        status: u16,
        /// HTTP method of the request
        method: String,
        /// Endpoint path of the request
        endpoint: String,
        /// Flattened, de-duplicated messages extracted from the body
        messages: Vec<String>,
        /// Parsed JSON body, when the body was JSON
        body: Option<serde_json::Value>,
    },

    /// The backend answered with an HTML page where JSON was expected
    #[error("Unexpected HTML response with status {status} ({method} {endpoint}): {diagnostic}")]
    HtmlResponse {
        /// HTTP status code
        status: u16,
        /// HTTP method of the request
        method: String,
        /// Endpoint path of the request
        endpoint: String,
        /// Diagnostic describing the likely misconfiguration
        diagnostic: String,
    },

    /// Durable storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A 2xx response whose body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Normalized sign-in / sign-up failure
    #[error("{0}")]
    Authentication(String),

    /// The client was shut down by the host application
    #[error("Client has been shut down")]
    Closed,
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ApiError>;

const DISALLOWED_HOST_DIAGNOSTIC: &str = "the API host rejected this request (DisallowedHost). \
     Add the API hostname to the backend's ALLOWED_HOSTS setting";
const GENERIC_HTML_DIAGNOSTIC: &str =
    "the server returned a web page instead of API data. Check the configured API base URL";

fn render_messages(messages: &[String]) -> String {
    if messages.is_empty() {
        String::new()
    } else {
        format!(": {}", messages.join(" | "))
    }
}

impl ApiError {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(method: impl Into<String>, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            method: method.into(),
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invalid response error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create an authentication error
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Build an error from a non-success response.
    ///
    /// HTML bodies become [`ApiError::HtmlResponse`]; JSON bodies are flattened
    /// into messages; any other text body is kept as a single message.
    pub fn from_response(
        status: u16,
        method: impl Into<String>,
        endpoint: impl Into<String>,
        content_type: Option<&str>,
        body: &str,
    ) -> Self {
        let method = method.into();
        let endpoint = endpoint.into();

        if looks_like_html(content_type, body) {
            let diagnostic = if body.contains("DisallowedHost") || body.contains("Invalid HTTP_HOST") {
                DISALLOWED_HOST_DIAGNOSTIC
            } else {
                GENERIC_HTML_DIAGNOSTIC
            };
            return Self::HtmlResponse {
                status,
                method,
                endpoint,
                diagnostic: diagnostic.to_string(),
            };
        }

        let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
        let messages = match &parsed {
            Some(value) => flatten_error_messages(value),
            None if body.trim().is_empty() => Vec::new(),
            None => vec![body.trim().to_string()],
        };

        Self::Http {
            status,
            method,
            endpoint,
            messages,
            body: parsed,
        }
    }

    /// HTTP status carried by this error, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::HtmlResponse { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is a 401 response
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// First distinct message extracted from the response body
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        match self {
            Self::Http { messages, .. } => messages.first().map(String::as_str),
            _ => None,
        }
    }

    /// Short user-facing text, without the status/method/endpoint prefix
    /// for validation errors.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            Self::Timeout { .. } => "The server took too long to respond. Please try again.".to_string(),
            Self::Http { messages, .. } if !messages.is_empty() => messages.join(" | "),
            Self::HtmlResponse { diagnostic, .. } => capitalize(diagnostic),
            other => other.to_string(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Anything that can be resolved into one flat user-visible message.
pub trait ErrorSource {
    /// Raw message text before normalization
    fn raw_message(&self) -> String;
}

impl ErrorSource for ApiError {
    fn raw_message(&self) -> String {
        self.user_message()
    }
}

impl ErrorSource for str {
    fn raw_message(&self) -> String {
        self.to_string()
    }
}

impl ErrorSource for String {
    fn raw_message(&self) -> String {
        self.clone()
    }
}

impl<T: ErrorSource + ?Sized> ErrorSource for &T {
    fn raw_message(&self) -> String {
        (**self).raw_message()
    }
}

/// Resolve an error into one flat string, falling back when nothing usable
/// is present.
///
/// JSON object text is flattened the same way response bodies are; any other
/// text is returned trimmed and otherwise untouched, so formatting an already
/// formatted message is a no-op.
///
/// ```
/// use skyshot_client::error::format_error_message;
///
/// let raw = r#"{"field1": ["Required"], "nested": {"field2": "Too short"}}"#;
/// let once = format_error_message(Some(raw), "Something went wrong");
/// assert_eq!(once, "Field1: Required | Nested field2: Too short");
/// assert_eq!(format_error_message(Some(once.as_str()), "Something went wrong"), once);
/// ```
pub fn format_error_message<E: ErrorSource + ?Sized>(error: Option<&E>, fallback: &str) -> String {
    let Some(error) = error else {
        return fallback.to_string();
    };

    let raw = error.raw_message();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }

    if trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            let messages = flatten_error_messages(&value);
            return if messages.is_empty() {
                fallback.to_string()
            } else {
                messages.join(" | ")
            };
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_message_follows_field_order() {
        let raw = r#"{"password": ["Too short"], "email": ["Invalid"]}"#;
        assert_eq!(
            format_error_message(Some(raw), "fallback"),
            "Password: Too short | Email: Invalid"
        );
    }

    #[test]
    fn test_timeout_display_keeps_sub_second_precision() {
        let err = ApiError::timeout("GET", "/slow/", Duration::from_millis(200));
        let shown = err.to_string();
        assert!(shown.starts_with("Request timed out after 200ms: GET /slow/"), "{shown}");

        let err = ApiError::timeout("POST", "/api/auth/token/refresh/", Duration::from_secs(30));
        assert!(err.to_string().starts_with("Request timed out after 30s: POST"));
    }

    #[test]
    fn test_http_error_display_includes_context() {
        let err = ApiError::from_response(
            400,
            "POST",
            "/api/auth/operator/login/",
            Some("application/json"),
            r#"{"email": ["This field is required."]}"#,
        );
        assert_eq!(
            err.to_string(),
            "Request failed with status 400 (POST /api/auth/operator/login/): Email: This field is required."
        );
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_disallowed_host_page_gets_diagnostic() {
        let body = "<!DOCTYPE html><html><body><h1>DisallowedHost at /</h1>Invalid HTTP_HOST header</body></html>";
        let err = ApiError::from_response(400, "GET", "/api/auth/profile/", Some("text/html"), body);
        match &err {
            ApiError::HtmlResponse { diagnostic, .. } => assert!(diagnostic.contains("ALLOWED_HOSTS")),
            other => panic!("expected HtmlResponse, got {other:?}"),
        }
        assert!(!err.to_string().contains("<html>"));
    }

    #[test]
    fn test_html_sniffed_without_content_type() {
        let err = ApiError::from_response(502, "GET", "/x/", None, "  <html><body>Bad gateway</body></html>");
        assert!(matches!(err, ApiError::HtmlResponse { status: 502, .. }));
    }

    #[test]
    fn test_plain_text_body_kept_as_message() {
        let err = ApiError::from_response(500, "GET", "/x/", Some("text/plain"), "Server Error");
        assert_eq!(err.first_message(), Some("Server Error"));
    }

    #[test]
    fn test_format_error_message_fallbacks() {
        assert_eq!(format_error_message::<ApiError>(None, "fallback"), "fallback");
        assert_eq!(format_error_message(Some("   "), "fallback"), "fallback");
        assert_eq!(format_error_message(Some("{}"), "fallback"), "fallback");
    }

    #[test]
    fn test_format_error_message_for_network_error() {
        let err = ApiError::network("dns error");
        assert_eq!(
            format_error_message(Some(&err), "fallback"),
            "Unable to reach the server. Check your connection and try again."
        );
    }

    #[test]
    fn test_format_error_message_prefers_body_messages() {
        let err = ApiError::from_response(400, "POST", "/x/", None, r#"{"detail": "Invalid credentials"}"#);
        assert_eq!(format_error_message(Some(&err), "fallback"), "Invalid credentials");
    }

    #[test]
    fn test_unauthorized_detection() {
        let err = ApiError::from_response(401, "GET", "/x/", None, "");
        assert!(err.is_unauthorized());
        assert!(!ApiError::network("x").is_unauthorized());
    }
}
