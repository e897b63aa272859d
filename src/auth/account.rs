//! Operator sign-in, sign-up and profile operations

use std::sync::Arc;

use serde_json::{Map, Value, json};
use typed_builder::TypedBuilder;

use super::credentials::{CredentialStore, StoredCredential};
use super::decode::{LoginOutcome, SignUpResult, decode_login, decode_sign_up, decode_user};
use super::token::TokenPair;
use super::user::{ProfileUpdate, User};
use super::{LOGIN_PATH, PROFILE_PATH, REGISTRATION_PATH};
use crate::error::{ApiError, Result, format_error_message};
use crate::http::ApiClient;
use crate::utils::first_error_message;

const SIGN_IN_FAILED: &str = "Unable to sign in. Check your credentials and try again.";
const SIGN_UP_FAILED: &str = "Unable to create your account. Please try again.";

/// Successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInResult {
    /// Issued tokens; `None` when the backend keeps the session itself
    pub tokens: Option<TokenPair>,
    /// Signed-in user, when the backend returned one
    pub user: Option<User>,
}

/// New operator account details.
#[derive(Clone, TypedBuilder)]
pub struct SignUpRequest {
    /// Email address
    #[builder(setter(into))]
    pub email: String,
    /// Username
    #[builder(setter(into))]
    pub username: String,
    /// Password, sent as both `password1` and `password2`
    #[builder(setter(into))]
    pub password: String,
    /// First name
    #[builder(default, setter(strip_option, into))]
    pub first_name: Option<String>,
    /// Last name
    #[builder(default, setter(strip_option, into))]
    pub last_name: Option<String>,
}

impl std::fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

impl SignUpRequest {
    fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("email".into(), json!(self.email));
        body.insert("username".into(), json!(self.username));
        body.insert("password1".into(), json!(self.password));
        body.insert("password2".into(), json!(self.password));

        for (key, value) in [("first_name", &self.first_name), ("last_name", &self.last_name)] {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                body.insert(key.into(), json!(value));
            }
        }
        Value::Object(body)
    }
}

/// Account operations for the operator app.
///
/// Login, sign-up and refresh go through the unauthenticated client; profile
/// calls go through the authenticated one.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: Arc<ApiClient>,
    credentials: CredentialStore,
}

impl AuthService {
    /// Create a service on top of `client`, sharing its durable store
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        let credentials = CredentialStore::new(Arc::clone(client.store()));
        Self { client, credentials }
    }

    /// Underlying authenticated client
    #[must_use]
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// Stored credentials and preferences
    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Load tokens from a previous run.
    ///
    /// Returns whether a refresh token is available, i.e. whether the
    /// session can be resumed without signing in again.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read.
    pub async fn restore_session(&self) -> Result<bool> {
        let tokens = self.client.tokens().load_stored_tokens().await?;
        Ok(tokens.refresh.is_some())
    }

    /// Sign in with an email or username and a password.
    ///
    /// On success the credentials are remembered for
    /// [`AuthService::silent_sign_in`]; failing to store them is only logged.
    ///
    /// # Errors
    /// Any failure clears the stored tokens and surfaces as
    /// [`ApiError::Authentication`] with a flat message.
    pub async fn sign_in(&self, identifier: &str, password: &str) -> Result<SignInResult> {
        let identifier = identifier.trim();

        match self.try_sign_in(identifier, password).await {
            Ok(result) => {
                let credential = StoredCredential::new(identifier, password);
                if let Err(e) = self.credentials.persist_credentials(&credential).await {
                    tracing::warn!(error = %e, "Failed to remember credentials");
                }
                tracing::info!(has_tokens = result.tokens.is_some(), "Signed in");
                Ok(result)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Sign-in failed");
                self.discard_tokens().await;
                Err(ApiError::authentication(format_error_message(Some(&e), SIGN_IN_FAILED)))
            }
        }
    }

    async fn try_sign_in(&self, identifier: &str, password: &str) -> Result<SignInResult> {
        let body = json!({
            "password": password,
            "email": identifier,
            "username": identifier,
            "login_identifier": identifier,
        });
        let response = self.client.public().post_json(LOGIN_PATH, &body).await?;

        match decode_login(&response) {
            LoginOutcome::Tokens { tokens, user } => {
                self.client.tokens().persist_tokens(&tokens).await?;
                Ok(SignInResult {
                    tokens: Some(tokens),
                    user,
                })
            }
            LoginOutcome::SessionOnly { user } => {
                tracing::debug!("Login returned no tokens; assuming session-cookie authentication");
                Ok(SignInResult {
                    tokens: None,
                    user: Some(user),
                })
            }
            LoginOutcome::Empty => match self.fetch_profile().await {
                Ok(user) => Ok(SignInResult {
                    tokens: None,
                    user: Some(user),
                }),
                Err(e) => {
                    tracing::debug!(error = %e, "Profile lookup after empty login response failed");
                    let message = first_error_message(&response)
                        .unwrap_or_else(|| SIGN_IN_FAILED.to_string());
                    Err(ApiError::authentication(message))
                }
            },
        }
    }

    /// Register a new operator account.
    ///
    /// Tokens are persisted when the backend issued both.
    ///
    /// # Errors
    /// Any failure clears the stored tokens and surfaces as
    /// [`ApiError::Authentication`] with a flat message.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResult> {
        match self.try_sign_up(request).await {
            Ok(result) => {
                tracing::info!(
                    has_tokens = result.tokens.is_some(),
                    requires_verification = result.requires_verification,
                    "Signed up"
                );
                Ok(result)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Sign-up failed");
                self.discard_tokens().await;
                Err(ApiError::authentication(format_error_message(Some(&e), SIGN_UP_FAILED)))
            }
        }
    }

    async fn try_sign_up(&self, request: &SignUpRequest) -> Result<SignUpResult> {
        let response = self
            .client
            .public()
            .post_json(REGISTRATION_PATH, &request.to_body())
            .await?;

        let result = decode_sign_up(&response);
        if let Some(tokens) = &result.tokens {
            self.client.tokens().persist_tokens(tokens).await?;
        }
        Ok(result)
    }

    /// Fetch the signed-in operator's profile
    ///
    /// # Errors
    /// Returns an error if the request fails or the body has no user id.
    pub async fn fetch_profile(&self) -> Result<User> {
        let body: Value = self.client.get_json(PROFILE_PATH).await?;
        decode_user(&body)
            .ok_or_else(|| ApiError::invalid_response("Profile response did not include a user id"))
    }

    /// Update the signed-in operator's profile
    ///
    /// # Errors
    /// Returns an error if the request fails or the body has no user id.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        let body = self
            .client
            .put_json(PROFILE_PATH, &serde_json::to_value(update)?)
            .await?;
        decode_user(&body)
            .ok_or_else(|| ApiError::invalid_response("Profile response did not include a user id"))
    }

    /// Sign in with remembered credentials.
    ///
    /// Returns `Ok(None)` when no complete credential pair is stored.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read or the sign-in fails.
    pub async fn silent_sign_in(&self) -> Result<Option<SignInResult>> {
        let stored = self.credentials.load_stored_credentials().await?;
        let Some((identifier, password)) = stored.complete() else {
            tracing::debug!("No stored credentials for silent sign-in");
            return Ok(None);
        };

        self.sign_in(identifier, password).await.map(Some)
    }

    /// Forget tokens and remembered credentials.
    ///
    /// Both are always attempted. A refresh still in flight is abandoned
    /// and whatever tokens it returns are discarded.
    ///
    /// # Errors
    /// Returns the first storage error encountered.
    pub async fn sign_out(&self) -> Result<()> {
        self.client.refresher().abandon();
        let tokens = self.client.tokens().clear_stored_tokens().await;
        let credentials = self.credentials.clear_stored_credentials().await;
        tracing::info!("Signed out");

        tokens?;
        credentials?;
        Ok(())
    }

    async fn discard_tokens(&self) {
        if let Err(e) = self.client.tokens().clear_stored_tokens().await {
            tracing::warn!(error = %e, "Failed to clear stored tokens");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_up_body_omits_empty_optionals() {
        let request = SignUpRequest::builder()
            .email("p@example.com")
            .username("pilot")
            .password("hunter22")
            .first_name("  ")
            .last_name("Byron")
            .build();

        assert_eq!(
            request.to_body(),
            json!({
                "email": "p@example.com",
                "username": "pilot",
                "password1": "hunter22",
                "password2": "hunter22",
                "last_name": "Byron",
            })
        );
    }

    #[test]
    fn test_sign_up_request_debug_redacts_password() {
        let request = SignUpRequest::builder()
            .email("p@example.com")
            .username("pilot")
            .password("hunter22")
            .build();
        assert!(!format!("{request:?}").contains("hunter22"));
    }
}
