//! Token storage and management

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::storage::{SharedStore, StorageError, keys};

/// Access/refresh token pair issued by the backend.
///
/// Both values are opaque; nothing here parses or validates them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived token sent on every authenticated request
    pub access: String,
    /// Longer-lived token used only to mint new access tokens
    pub refresh: String,
}

impl TokenPair {
    /// Create a new token pair
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

// Keep secrets out of logs.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Tokens as currently held in memory. Either side may be absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StoredTokens {
    /// Current access token
    pub access: Option<String>,
    /// Current refresh token
    pub refresh: Option<String>,
}

impl StoredTokens {
    /// Both tokens, when both are present
    #[must_use]
    pub fn pair(&self) -> Option<TokenPair> {
        match (&self.access, &self.refresh) {
            (Some(access), Some(refresh)) => Some(TokenPair::new(access, refresh)),
            _ => None,
        }
    }

    /// Whether neither token is held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }
}

impl fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredTokens")
            .field("access", &self.access.as_ref().map(|_| "<redacted>"))
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Single source of truth for the session's tokens.
///
/// Every mutation writes through to durable storage while holding the write
/// lock, so in-memory state never diverges from what was last persisted.
pub struct TokenStore {
    store: SharedStore,
    state: RwLock<StoredTokens>,
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

impl TokenStore {
    /// Create an empty token store backed by `store`.
    ///
    /// Call [`TokenStore::load_stored_tokens`] to pick up tokens from a
    /// previous run.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            state: RwLock::new(StoredTokens::default()),
        }
    }

    /// Current access token
    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.access.clone()
    }

    /// Current refresh token
    pub async fn refresh_token(&self) -> Option<String> {
        self.state.read().await.refresh.clone()
    }

    /// Snapshot of both tokens
    pub async fn snapshot(&self) -> StoredTokens {
        self.state.read().await.clone()
    }

    /// `Authorization` header value for the current access token
    pub async fn authorization_header(&self) -> Option<String> {
        self.access_token().await.map(|token| format!("Bearer {token}"))
    }

    /// Load tokens from durable storage into memory.
    ///
    /// A refresh token found only under the legacy key is moved to the
    /// canonical key. Empty storage is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read or the migration write fails.
    pub async fn load_stored_tokens(&self) -> Result<StoredTokens, StorageError> {
        let mut state = self.state.write().await;

        let access = self.store.get(keys::ACCESS_TOKEN).await?;
        let mut refresh = self.store.get(keys::REFRESH_TOKEN).await?;
        let legacy = self.store.get(keys::LEGACY_REFRESH_TOKEN).await?;

        if refresh.is_none() {
            if let Some(legacy) = legacy {
                tracing::debug!("Migrating refresh token from legacy storage key");
                self.store.set(keys::REFRESH_TOKEN, &legacy).await?;
                self.store.delete(keys::LEGACY_REFRESH_TOKEN).await?;
                refresh = Some(legacy);
            }
        }

        *state = StoredTokens { access, refresh };
        tracing::debug!(
            has_access = state.access.is_some(),
            has_refresh = state.refresh.is_some(),
            "Loaded stored tokens"
        );
        Ok(state.clone())
    }

    /// Replace both tokens.
    ///
    /// Memory follows each successful write, so a failed refresh-token write
    /// leaves the new access token alongside the previous refresh token, the
    /// same pair storage now holds.
    ///
    /// # Errors
    ///
    /// Returns an error if either value cannot be written.
    pub async fn persist_tokens(&self, pair: &TokenPair) -> Result<(), StorageError> {
        let mut state = self.state.write().await;

        self.store.set(keys::ACCESS_TOKEN, &pair.access).await?;
        state.access = Some(pair.access.clone());

        self.store.set(keys::REFRESH_TOKEN, &pair.refresh).await?;
        state.refresh = Some(pair.refresh.clone());
        Ok(())
    }

    /// Store a refreshed access token, and the refresh token if the backend
    /// rotated it.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be written.
    pub async fn rotate_tokens(&self, access: &str, refresh: Option<&str>) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        self.write_rotation(&mut state, access, refresh).await
    }

    /// Like [`TokenStore::rotate_tokens`], but only while `used_refresh` is
    /// still the current refresh token.
    ///
    /// Returns `false`, writing nothing, when the session was cleared or
    /// replaced after the exchange started.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be written.
    pub async fn rotate_tokens_if_current(
        &self,
        used_refresh: &str,
        access: &str,
        refresh: Option<&str>,
    ) -> Result<bool, StorageError> {
        let mut state = self.state.write().await;
        if state.refresh.as_deref() != Some(used_refresh) {
            return Ok(false);
        }
        self.write_rotation(&mut state, access, refresh).await?;
        Ok(true)
    }

    /// Forget both tokens, in memory and in storage.
    ///
    /// Memory is cleared first and every key delete is attempted even if an
    /// earlier one fails. Safe to call when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    pub async fn clear_stored_tokens(&self) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        self.clear_locked(&mut state).await
    }

    /// Like [`TokenStore::clear_stored_tokens`], but only while `used_refresh`
    /// is still the current refresh token.
    ///
    /// Returns `false` when a newer session has taken its place.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    pub async fn clear_stored_tokens_if_current(&self, used_refresh: &str) -> Result<bool, StorageError> {
        let mut state = self.state.write().await;
        if state.refresh.as_deref() != Some(used_refresh) {
            return Ok(false);
        }
        self.clear_locked(&mut state).await?;
        Ok(true)
    }

    async fn write_rotation(
        &self,
        state: &mut StoredTokens,
        access: &str,
        refresh: Option<&str>,
    ) -> Result<(), StorageError> {
        self.store.set(keys::ACCESS_TOKEN, access).await?;
        state.access = Some(access.to_string());

        if let Some(refresh) = refresh {
            self.store.set(keys::REFRESH_TOKEN, refresh).await?;
            state.refresh = Some(refresh.to_string());
        }
        Ok(())
    }

    async fn clear_locked(&self, state: &mut StoredTokens) -> Result<(), StorageError> {
        *state = StoredTokens::default();

        let mut first_error = None;
        for key in [keys::ACCESS_TOKEN, keys::REFRESH_TOKEN, keys::LEGACY_REFRESH_TOKEN] {
            if let Err(e) = self.store.delete(key).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
