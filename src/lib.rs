//! # Skyshot API client
//!
//! Async client for the Skyshot operator backend: token-based sessions with
//! transparent, single-flight token refresh, plus sign-in and sign-up
//! normalization.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use skyshot_client::{ApiClient, AuthService, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::builder()
//!         .config(ClientConfig::builder().base_url("https://api.skyshot.app").build())
//!         .build()?;
//!     let client = Arc::new(client);
//!
//!     let auth = AuthService::new(Arc::clone(&client));
//!     auth.sign_in("pilot@example.com", "hunter22").await?;
//!
//!     let jobs: serde_json::Value = client.get_json("/api/jobs/").await?;
//!     println!("{jobs}");
//!
//!     client.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Handling expired sessions
//!
//! A request that gets `401` is retried once with a refreshed access token.
//! When that is not possible the registered
//! [`UnauthorizedHandler`](callbacks::UnauthorizedHandler) is called so the
//! host can return to its login screen:
//!
//! ```no_run
//! # use skyshot_client::{ApiClient, FnUnauthorizedHandler};
//! # fn example() -> skyshot_client::Result<()> {
//! let client = ApiClient::builder()
//!     .unauthorized_handler(FnUnauthorizedHandler::new(|event| {
//!         Box::pin(async move {
//!             eprintln!("Session expired ({} {})", event.method, event.endpoint);
//!         })
//!     }))
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`auth`]: token and credential storage, refresh coordination, sign-in
//! - [`http`]: transport seam, public and authenticated clients
//! - [`storage`]: secure key-value storage backends
//! - [`callbacks`]: host callbacks
//! - [`config`]: base URL and timeouts
//! - [`lifecycle`]: explicit shutdown hooks
//! - [`error`]: error types and message flattening
//! - [`testing`]: scripted transport for tests
//!
//! ## Configuration
//!
//! [`ClientConfig::from_env`] reads the base URL from `SKYSHOT_API_URL`
//! (falling back to `SKYSHOT_API_BASE_URL`). A missing value is logged and
//! requests fail with [`ApiError::InvalidConfig`].
//!
//! ## Logging
//!
//! This crate uses [`tracing`](https://crates.io/crates/tracing) for structured logging.
//! Tokens are never logged. To see logs, attach a tracing subscriber in your
//! application:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, ApiError>`](Result). Use
//! [`format_error_message`] to turn any error into a single line for display:
//!
//! ```
//! use skyshot_client::{ApiError, format_error_message};
//!
//! let err = ApiError::network("connection refused");
//! assert_eq!(
//!     format_error_message(Some(&err), "Something went wrong"),
//!     "Unable to reach the server. Check your connection and try again."
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod callbacks;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod storage;
pub mod testing;
pub mod utils;

// Re-export commonly used types
pub use auth::{
    AuthService, CredentialStore, ProfileUpdate, RefreshCoordinator, SignInResult, SignUpRequest,
    SignUpResult, StoredCredential, TokenPair, TokenStore, User,
};
pub use callbacks::{
    FnUnauthorizedHandler, SharedUnauthorizedHandler, UnauthorizedEvent, UnauthorizedHandler,
};
pub use config::ClientConfig;
pub use error::{ApiError, Result, format_error_message};
pub use http::{ApiClient, ApiClientBuilder, ApiRequest, ApiResponse, HttpTransport, Method, PublicClient};
pub use storage::{FileStore, MemoryStore, SecureStore, SharedStore};

/// Version of the client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
