//! reqwest-backed transport

use std::time::Duration;

use async_trait::async_trait;

use super::{ApiRequest, ApiResponse, HttpTransport, Method};
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};

/// Production transport built on a shared [`reqwest::Client`].
///
/// Every request carries the configured timeout. A timed-out request maps to
/// [`ApiError::Timeout`]; any other failure to get a response maps to
/// [`ApiError::Network`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build a transport from the client configuration
    ///
    /// # Errors
    /// Returns `ApiError::InvalidConfig` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::invalid_config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    fn map_error(&self, error: &reqwest::Error, request: &ApiRequest) -> ApiError {
        if error.is_timeout() {
            ApiError::timeout(request.method.as_str(), &request.path, self.timeout)
        } else {
            ApiError::network(error.to_string())
        }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, url: &str, request: &ApiRequest) -> Result<ApiResponse> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), url)
            .header(reqwest::header::ACCEPT, "application/json");

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_error(&e, request))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| self.map_error(&e, request))?;

        Ok(ApiResponse {
            status,
            content_type,
            body,
        })
    }
}
