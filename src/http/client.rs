//! Public and authenticated API clients

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::{AUTHORIZATION, ApiRequest, ApiResponse, HttpTransport, ReqwestTransport, SharedTransport};
use crate::auth::{RefreshCoordinator, TokenStore};
use crate::callbacks::{SharedUnauthorizedHandler, UnauthorizedEvent, UnauthorizedHandler};
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::lifecycle::Disposers;
use crate::storage::{FileStore, SecureStore, SharedStore};
use crate::utils::truncate_for_display;

const UNAUTHORIZED: u16 = 401;

/// Client for unauthenticated endpoints.
///
/// Never sends an `Authorization` header and never retries. Cheap to clone.
#[derive(Clone)]
pub struct PublicClient {
    config: Arc<ClientConfig>,
    transport: SharedTransport,
}

impl fmt::Debug for PublicClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicClient")
            .field("base_url", &self.config.normalized_base_url())
            .finish_non_exhaustive()
    }
}

impl PublicClient {
    /// Create a client using the reqwest transport
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create a client over a custom transport
    #[must_use]
    pub fn with_transport(config: ClientConfig, transport: SharedTransport) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    /// Client configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send exactly what `request` holds and return whatever came back.
    pub(crate) async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.config.url_for(&request.path)?;

        tracing::debug!(
            method = %request.method,
            endpoint = %request.path,
            retried = request.retried,
            "Sending request"
        );
        let response = self.transport.execute(&url, request).await?;
        tracing::debug!(
            method = %request.method,
            endpoint = %request.path,
            status = response.status,
            "Received response"
        );
        // Success bodies may carry tokens; only error bodies are logged.
        if !response.is_success() {
            tracing::trace!(body = %truncate_for_display(&response.body, 512), "Error response body");
        }

        Ok(response)
    }

    /// Send `request` without credentials.
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-2xx status.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        request.remove_header(AUTHORIZATION);
        self.dispatch(&request).await?.into_result(&request)
    }

    /// POST a JSON body and decode the JSON response
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-2xx status, or invalid JSON.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        self.send(ApiRequest::post(path, body.clone())).await?.json_value()
    }
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ClientConfig>,
    transport: Option<SharedTransport>,
    store: Option<SharedStore>,
    on_unauthorized: Option<SharedUnauthorizedHandler>,
}

impl fmt::Debug for ApiClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClientBuilder")
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .field("custom_store", &self.store.is_some())
            .field("on_unauthorized", &self.on_unauthorized.is_some())
            .finish()
    }
}

impl ApiClientBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration (default: [`ClientConfig::from_env`])
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the transport (default: [`ReqwestTransport`])
    #[must_use]
    pub fn transport(mut self, transport: impl HttpTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set the durable store for tokens (default: [`FileStore`])
    #[must_use]
    pub fn store(mut self, store: impl SecureStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Called when a request ends in an unrecoverable `401`
    #[must_use]
    pub fn unauthorized_handler(mut self, handler: impl UnauthorizedHandler + 'static) -> Self {
        self.on_unauthorized = Some(Arc::new(handler));
        self
    }

    /// Build the client.
    ///
    /// Tokens are not loaded here; call
    /// [`TokenStore::load_stored_tokens`] (or `AuthService::restore_session`)
    /// to resume a previous session.
    ///
    /// # Errors
    /// Returns an error if the default transport cannot be built.
    pub fn build(self) -> Result<ApiClient> {
        let config = self.config.unwrap_or_else(ClientConfig::from_env);
        let transport: SharedTransport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&config)?),
        };
        let store: SharedStore = self
            .store
            .unwrap_or_else(|| Arc::new(FileStore::new()));

        let public = PublicClient::with_transport(config, transport);
        let tokens = Arc::new(TokenStore::new(Arc::clone(&store)));
        let refresher = Arc::new(RefreshCoordinator::new(Arc::clone(&tokens), public.clone()));

        let disposers = Disposers::new();
        let pending = Arc::clone(&refresher);
        disposers.register("refresh-coordinator", move || pending.abandon());

        Ok(ApiClient {
            public,
            store,
            tokens,
            refresher,
            on_unauthorized: self.on_unauthorized,
            disposers,
        })
    }
}

/// Authenticated client.
///
/// Attaches `Authorization: Bearer <access>` when an access token is held.
/// On a `401` it refreshes the token once (shared with every other request
/// failing at the same time) and re-issues the request a single time.
pub struct ApiClient {
    public: PublicClient,
    store: SharedStore,
    tokens: Arc<TokenStore>,
    refresher: Arc<RefreshCoordinator>,
    on_unauthorized: Option<SharedUnauthorizedHandler>,
    disposers: Disposers,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("public", &self.public)
            .field("refresher", &self.refresher)
            .field("disposers", &self.disposers)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a builder
    #[must_use]
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    /// Send `request` with the current access token.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-2xx status (including a
    /// `401` that a refresh could not fix), or after [`ApiClient::shutdown`].
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        if self.disposers.is_disposed() {
            return Err(ApiError::Closed);
        }

        let mut bearer = self.tokens.access_token().await;
        loop {
            match &bearer {
                Some(token) => request.set_bearer(token),
                None => request.remove_header(AUTHORIZATION),
            }

            let response = self.public.dispatch(&request).await?;
            if response.status != UNAUTHORIZED {
                return response.into_result(&request);
            }
            let error = response.to_error(&request);

            if request.retried {
                tracing::debug!(endpoint = %request.path, "Unauthorized after token refresh");
                self.notify_unauthorized(&request).await;
                return Err(error);
            }

            if self.tokens.refresh_token().await.is_none() {
                tracing::debug!(endpoint = %request.path, "Unauthorized with no refresh token");
                self.notify_unauthorized(&request).await;
                return Err(error);
            }

            request.retried = true;
            match self.refresher.refresh().await {
                Some(token) => bearer = Some(token),
                None => {
                    self.notify_unauthorized(&request).await;
                    return Err(error);
                }
            }
        }
    }

    async fn notify_unauthorized(&self, request: &ApiRequest) {
        if let Some(handler) = &self.on_unauthorized {
            handler
                .call(UnauthorizedEvent {
                    method: request.method,
                    endpoint: request.path.clone(),
                    retried: request.retried,
                })
                .await;
        }
    }

    /// GET `path` and decode the JSON response
    ///
    /// # Errors
    /// Same as [`ApiClient::send`], plus JSON decoding failures.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    /// POST a JSON body and decode the JSON response
    ///
    /// # Errors
    /// Same as [`ApiClient::send`], plus JSON decoding failures.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        self.send(ApiRequest::post(path, body.clone())).await?.json_value()
    }

    /// PUT a JSON body and decode the JSON response
    ///
    /// # Errors
    /// Same as [`ApiClient::send`], plus JSON decoding failures.
    pub async fn put_json(&self, path: &str, body: &Value) -> Result<Value> {
        self.send(ApiRequest::put(path, body.clone())).await?.json_value()
    }

    /// PATCH a JSON body and decode the JSON response
    ///
    /// # Errors
    /// Same as [`ApiClient::send`], plus JSON decoding failures.
    pub async fn patch_json(&self, path: &str, body: &Value) -> Result<Value> {
        self.send(ApiRequest::patch(path, body.clone())).await?.json_value()
    }

    /// DELETE `path`
    ///
    /// # Errors
    /// Same as [`ApiClient::send`].
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(ApiRequest::delete(path)).await.map(|_| ())
    }

    /// Token store backing this client
    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Durable store backing this client
    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Unauthenticated client sharing this client's configuration and transport
    #[must_use]
    pub fn public(&self) -> &PublicClient {
        &self.public
    }

    /// Refresh coordinator
    #[must_use]
    pub fn refresher(&self) -> &Arc<RefreshCoordinator> {
        &self.refresher
    }

    /// Register cleanup to run on [`ApiClient::shutdown`]
    pub fn on_shutdown(&self, name: &'static str, disposer: impl FnOnce() + Send + 'static) {
        self.disposers.register(name, disposer);
    }

    /// Token cancelled when the client shuts down
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.disposers.token()
    }

    /// Whether [`ApiClient::shutdown`] has been called
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.disposers.is_disposed()
    }

    /// Release the client's resources. Idempotent.
    ///
    /// Later calls to [`ApiClient::send`] fail with [`ApiError::Closed`].
    pub fn shutdown(&self) {
        let ran = self.disposers.dispose();
        if ran > 0 {
            tracing::debug!(disposers = ran, "API client shut down");
        }
    }
}
