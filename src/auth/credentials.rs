//! Convenience storage for the last successful login and a preferred name
//!
//! Independent of the token lifecycle: clearing tokens does not touch these
//! values, and losing them only costs the user a re-typed password.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::{SharedStore, StorageError, keys};

/// Last-used login pair.
///
/// The password is stored in plaintext; the backing [`crate::storage::SecureStore`]
/// is expected to be the platform's secure storage.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    /// Login email or identifier
    pub email: Option<String>,
    /// Login password
    pub password: Option<String>,
}

impl StoredCredential {
    /// Credential with both fields set
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    /// Both fields, when both are present
    #[must_use]
    pub fn complete(&self) -> Option<(&str, &str)> {
        match (&self.email, &self.password) {
            (Some(email), Some(password)) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredential")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Durable store for [`StoredCredential`] and the preferred display name.
#[derive(Clone)]
pub struct CredentialStore {
    store: SharedStore,
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Create a credential store backed by `store`
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Save the login pair. Absent fields delete their stored value.
    ///
    /// # Errors
    /// Returns an error if storage cannot be written.
    pub async fn persist_credentials(&self, credential: &StoredCredential) -> Result<(), StorageError> {
        self.put(keys::CREDENTIAL_EMAIL, credential.email.as_deref()).await?;
        self.put(keys::CREDENTIAL_PASSWORD, credential.password.as_deref()).await
    }

    /// Load the login pair; missing values come back as `None`.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read.
    pub async fn load_stored_credentials(&self) -> Result<StoredCredential, StorageError> {
        Ok(StoredCredential {
            email: self.store.get(keys::CREDENTIAL_EMAIL).await?,
            password: self.store.get(keys::CREDENTIAL_PASSWORD).await?,
        })
    }

    /// Delete the login pair.
    ///
    /// # Errors
    /// Returns an error if storage cannot be written.
    pub async fn clear_stored_credentials(&self) -> Result<(), StorageError> {
        self.store.delete(keys::CREDENTIAL_EMAIL).await?;
        self.store.delete(keys::CREDENTIAL_PASSWORD).await
    }

    /// Save the preferred display name, trimmed.
    ///
    /// `None`, empty, or whitespace-only input deletes the stored name.
    ///
    /// # Errors
    /// Returns an error if storage cannot be written.
    pub async fn persist_preferred_name(&self, name: Option<&str>) -> Result<(), StorageError> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        self.put(keys::PREFERRED_NAME, name).await
    }

    /// Load the preferred display name.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read.
    pub async fn load_preferred_name(&self) -> Result<Option<String>, StorageError> {
        self.store.get(keys::PREFERRED_NAME).await
    }

    async fn put(&self, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        match value {
            Some(value) => self.store.set(key, value).await,
            None => self.store.delete(key).await,
        }
    }
}
