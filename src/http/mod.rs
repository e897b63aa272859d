//! HTTP layer for talking to the Skyshot backend
//!
//! [`HttpTransport`] is the seam to the network. [`ReqwestTransport`] is the
//! production implementation; tests plug in scripted transports.
//!
//! Two clients sit on top of a transport:
//!
//! - [`PublicClient`] never sends credentials. Login, sign-up, and the token
//!   refresh exchange go through it.
//! - [`ApiClient`] attaches the bearer token and runs the refresh-and-retry
//!   protocol on `401`.

pub mod client;
mod reqwest_transport;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, Result};

pub use client::{ApiClient, ApiClientBuilder, PublicClient};
pub use reqwest_transport::ReqwestTransport;

/// `Authorization` header name
pub const AUTHORIZATION: &str = "Authorization";

/// HTTP methods used by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound request, relative to the configured base URL.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path (e.g. `/api/auth/profile/`) or absolute URL
    pub path: String,
    /// Extra headers
    pub headers: Vec<(String, String)>,
    /// JSON body
    pub body: Option<serde_json::Value>,
    /// Set once the request has been re-issued after a token refresh
    pub retried: bool,
}

impl ApiRequest {
    /// Create a request without a body
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
            retried: false,
        }
    }

    /// GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// POST request with a JSON body
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    /// PUT request with a JSON body
    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::Put, path).with_body(body)
    }

    /// PATCH request with a JSON body
    pub fn patch(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::Patch, path).with_body(body)
    }

    /// DELETE request
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attach a JSON body
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add or replace a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Header value, matched case-insensitively
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove_header(&name);
        self.headers.push((name, value.into()));
    }

    /// Remove a header, matched case-insensitively
    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Set `Authorization: Bearer <token>`
    pub fn set_bearer(&mut self, token: &str) {
        self.set_header(AUTHORIZATION, format!("Bearer {token}"));
    }
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case(AUTHORIZATION) {
                    (k.as_str(), "<redacted>")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();

        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &headers)
            .field("has_body", &self.body.is_some())
            .field("retried", &self.retried)
            .finish()
    }
}

/// Raw response from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// `Content-Type` header, if sent
    pub content_type: Option<String>,
    /// Response body as text
    pub body: String,
}

impl ApiResponse {
    /// Create a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    /// JSON response
    #[must_use]
    pub fn json_body(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: body.to_string(),
        }
    }

    /// 2xx status
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body into `T`
    ///
    /// # Errors
    /// Returns an error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Decode the body as JSON, treating an empty body as `null`
    ///
    /// # Errors
    /// Returns an error if a non-empty body is not valid JSON.
    pub fn json_value(&self) -> Result<serde_json::Value> {
        if self.body.trim().is_empty() {
            Ok(serde_json::Value::Null)
        } else {
            self.json()
        }
    }

    /// Error describing this response
    #[must_use]
    pub fn to_error(&self, request: &ApiRequest) -> ApiError {
        ApiError::from_response(
            self.status,
            request.method.as_str(),
            request.path.clone(),
            self.content_type.as_deref(),
            &self.body,
        )
    }

    /// `Ok(self)` on 2xx, otherwise the matching [`ApiError`]
    ///
    /// # Errors
    /// Returns an error for any non-2xx status.
    pub fn into_result(self, request: &ApiRequest) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(self.to_error(request))
        }
    }
}

/// Transport trait for sending requests to the backend
///
/// Implementations return every response that arrived, whatever its status.
/// `Err` is reserved for requests that got no response at all
/// ([`ApiError::Network`], [`ApiError::Timeout`]).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` to the absolute `url`
    ///
    /// # Errors
    /// Returns an error if no response was received.
    async fn execute(&self, url: &str, request: &ApiRequest) -> Result<ApiResponse>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn execute(&self, url: &str, request: &ApiRequest) -> Result<ApiResponse> {
        (**self).execute(url, request).await
    }
}

/// Type alias for a shared transport.
pub type SharedTransport = Arc<dyn HttpTransport>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_headers_case_insensitive() {
        let mut request = ApiRequest::get("/x/").with_header("authorization", "Bearer old");
        request.set_bearer("new");

        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("AUTHORIZATION"), Some("Bearer new"));

        request.remove_header("Authorization");
        assert_eq!(request.header(AUTHORIZATION), None);
    }

    #[test]
    fn test_request_debug_redacts_bearer() {
        let mut request = ApiRequest::get("/x/");
        request.set_bearer("super-secret");
        assert!(!format!("{request:?}").contains("super-secret"));
    }

    #[test]
    fn test_response_into_result() {
        let request = ApiRequest::post("/api/things/", json!({}));
        assert!(ApiResponse::new(201, "{}").into_result(&request).is_ok());

        let err = ApiResponse::json_body(400, &json!({"name": ["Required"]}))
            .into_result(&request)
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.first_message(), Some("Name: Required"));
    }

    #[test]
    fn test_empty_body_is_null() {
        assert_eq!(ApiResponse::new(204, "").json_value().unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Put.to_string(), "PUT");
        assert_eq!(ApiRequest::delete("/x/").method.as_str(), "DELETE");
    }
}
