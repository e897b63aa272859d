//! Client configuration

use std::time::Duration;

use typed_builder::TypedBuilder;

use crate::error::{ApiError, Result};

/// Environment variable holding the API base URL
pub const BASE_URL_ENV: &str = "SKYSHOT_API_URL";

/// Older name for [`BASE_URL_ENV`], still honored
pub const BASE_URL_FALLBACK_ENV: &str = "SKYSHOT_API_BASE_URL";

/// Timeout applied to every outbound request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn default_user_agent() -> String {
    format!("skyshot-client/{}", crate::VERSION)
}

/// Configuration shared by the public and authenticated clients.
///
/// # Example
///
/// ```
/// use skyshot_client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::builder()
///     .base_url("https://api.skyshot.app/")
///     .timeout(Duration::from_secs(10))
///     .build();
///
/// assert_eq!(
///     config.url_for("/api/auth/profile/").unwrap(),
///     "https://api.skyshot.app/api/auth/profile/"
/// );
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct ClientConfig {
    /// Base URL of the backend, e.g. `https://api.skyshot.app`
    #[builder(default, setter(strip_option, into))]
    pub base_url: Option<String>,

    /// Per-request timeout
    #[builder(default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,

    /// `User-Agent` header value
    #[builder(default = default_user_agent(), setter(into))]
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientConfig {
    /// Read the base URL from the environment.
    ///
    /// A missing base URL is logged, not fatal: the client still builds and
    /// requests fail with [`ApiError::InvalidConfig`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`ClientConfig::from_env`] with a custom variable lookup
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = [BASE_URL_ENV, BASE_URL_FALLBACK_ENV]
            .into_iter()
            .filter_map(&lookup)
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty());

        if base_url.is_none() {
            tracing::warn!(
                "{BASE_URL_ENV} is not set; API requests will fail until a base URL is configured"
            );
        }

        Self {
            base_url,
            ..Self::default()
        }
    }

    /// Base URL without trailing slashes
    #[must_use]
    pub fn normalized_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }

    /// Absolute URL for `path`. Absolute URLs pass through unchanged.
    ///
    /// # Errors
    /// Returns `ApiError::InvalidConfig` when no base URL is configured.
    pub fn url_for(&self, path: &str) -> Result<String> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(path.to_string());
        }

        let base = self.normalized_base_url().ok_or_else(|| {
            ApiError::invalid_config(format!(
                "API base URL is not configured (set {BASE_URL_ENV})"
            ))
        })?;

        if path.starts_with('/') {
            Ok(format!("{base}{path}"))
        } else {
            Ok(format!("{base}/{path}"))
        }
    }
}
