//! Operator authentication
//!
//! # Overview
//!
//! The session is a pair of opaque tokens issued by the backend:
//!
//! 1. [`AuthService::sign_in`] / [`AuthService::sign_up`] call the public
//!    endpoints and persist the returned pair in the [`TokenStore`]
//! 2. [`crate::ApiClient`] attaches the access token to every request
//! 3. On a `401` the [`RefreshCoordinator`] trades the refresh token for a
//!    new access token, once per burst of failures
//! 4. A failed refresh clears the session and the host's
//!    [`crate::callbacks::UnauthorizedHandler`] is told about it
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use skyshot_client::{ApiClient, AuthService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(ApiClient::builder().build()?);
//!     let auth = AuthService::new(Arc::clone(&client));
//!
//!     if !auth.restore_session().await? {
//!         auth.sign_in("pilot@example.com", "hunter22").await?;
//!     }
//!
//!     let me = auth.fetch_profile().await?;
//!     println!("Signed in as {}", me.display_name());
//!     Ok(())
//! }
//! ```
//!
//! # Security
//!
//! - Tokens and passwords never appear in `Debug` output
//! - The refresh exchange never carries an `Authorization` header
//! - [`crate::storage::FileStore`] writes with user-only permissions (600)

mod account;
mod credentials;
pub mod decode;
pub(crate) mod refresh;
mod token;
mod user;

pub use account::{AuthService, SignInResult, SignUpRequest};
pub use credentials::{CredentialStore, StoredCredential};
pub use decode::{LoginOutcome, SignUpResult, TokenGrant};
pub use refresh::RefreshCoordinator;
pub use token::{StoredTokens, TokenPair, TokenStore};
pub use user::{ProfileUpdate, User};

/// Refresh-token exchange endpoint
pub const REFRESH_PATH: &str = "/api/auth/token/refresh/";

/// Operator login endpoint
pub const LOGIN_PATH: &str = "/api/auth/operator/login/";

/// Operator registration endpoint
pub const REGISTRATION_PATH: &str = "/api/auth/operator/registration/";

/// Signed-in user's profile endpoint
pub const PROFILE_PATH: &str = "/api/auth/profile/";
