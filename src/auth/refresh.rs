//! Single-flight access token refresh
//!
//! Any number of requests can hit a `401` at the same moment. The first one
//! starts the exchange; everyone else awaits a clone of the same shared
//! future, so the backend sees exactly one refresh request per burst.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::json;

use super::REFRESH_PATH;
use super::decode::TokenGrant;
use super::token::TokenStore;
use crate::error::{ApiError, Result};
use crate::http::PublicClient;

type SharedRefresh = Shared<BoxFuture<'static, Option<String>>>;

/// In-flight exchange tagged with the generation that started it.
type Slot = Option<(u64, SharedRefresh)>;

/// Clears the pending slot when the exchange task ends, however it ends.
///
/// Only clears the slot if it still holds this generation, so an exchange
/// abandoned at shutdown cannot clobber a newer one.
struct SlotReset {
    slot: Arc<Mutex<Slot>>,
    generation: u64,
}

impl Drop for SlotReset {
    fn drop(&mut self) {
        let mut slot = lock(&self.slot);
        if slot.as_ref().is_some_and(|(generation, _)| *generation == self.generation) {
            *slot = None;
        }
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Coordinates refresh-token exchanges for one [`TokenStore`].
pub struct RefreshCoordinator {
    tokens: Arc<TokenStore>,
    client: PublicClient,
    pending: Arc<Mutex<Slot>>,
    generations: AtomicU64,
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    /// Create a coordinator that exchanges tokens through `client`.
    ///
    /// `client` must be the unauthenticated client: the refresh call itself
    /// must never pass through the `401` interceptor.
    #[must_use]
    pub fn new(tokens: Arc<TokenStore>, client: PublicClient) -> Self {
        Self {
            tokens,
            client,
            pending: Arc::new(Mutex::new(None)),
            generations: AtomicU64::new(0),
        }
    }

    /// Obtain a fresh access token, joining an exchange already in flight.
    ///
    /// Resolves to `None` when the exchange failed, in which case the stored
    /// session has been cleared, or when the session was signed out or
    /// replaced while the exchange ran, in which case the new tokens are
    /// discarded.
    pub async fn refresh(&self) -> Option<String> {
        let shared = {
            let mut slot = lock(&self.pending);
            match slot.as_ref() {
                Some((_, existing)) => {
                    tracing::debug!("Joining in-flight token refresh");
                    existing.clone()
                }
                None => {
                    let generation = self.generations.fetch_add(1, Ordering::Relaxed);
                    let started = self.start(generation);
                    *slot = Some((generation, started.clone()));
                    started
                }
            }
        };

        shared.await
    }

    /// Whether an exchange is currently in flight
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        lock(&self.pending).is_some()
    }

    /// Forget the in-flight exchange, if any.
    ///
    /// Callers already awaiting it still get its result; the next `401`
    /// starts a new exchange.
    pub fn abandon(&self) {
        if lock(&self.pending).take().is_some() {
            tracing::debug!("Abandoned in-flight token refresh");
        }
    }

    // The exchange runs on its own task so a caller dropping its future does
    // not cancel the network call for everyone else.
    fn start(&self, generation: u64) -> SharedRefresh {
        let tokens = Arc::clone(&self.tokens);
        let client = self.client.clone();
        let reset = SlotReset {
            slot: Arc::clone(&self.pending),
            generation,
        };

        let task = tokio::spawn(async move {
            let _reset = reset;
            exchange(&tokens, &client).await
        });

        async move {
            task.await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "Token refresh task failed");
                None
            })
        }
        .boxed()
        .shared()
    }
}

async fn exchange(tokens: &TokenStore, client: &PublicClient) -> Option<String> {
    let Some(used) = tokens.refresh_token().await else {
        tracing::warn!("Token refresh requested without a refresh token; clearing session");
        if let Err(e) = tokens.clear_stored_tokens().await {
            tracing::warn!(error = %e, "Failed to clear stored tokens");
        }
        return None;
    };

    match try_exchange(tokens, client, &used).await {
        Ok(Some(access)) => {
            tracing::info!("Access token refreshed");
            Some(access)
        }
        Ok(None) => {
            tracing::debug!("Session changed during token refresh; discarding new tokens");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Token refresh failed; clearing session");
            match tokens.clear_stored_tokens_if_current(&used).await {
                Ok(true) => {}
                Ok(false) => tracing::debug!("Session changed during token refresh; keeping it"),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to clear stored tokens after refresh failure");
                }
            }
            None
        }
    }
}

/// `Ok(None)` when the session was signed out or replaced mid-exchange.
async fn try_exchange(tokens: &TokenStore, client: &PublicClient, used: &str) -> Result<Option<String>> {
    let body = client.post_json(REFRESH_PATH, &json!({ "refresh": used })).await?;

    let grant = TokenGrant::decode(&body);
    let access = grant
        .access
        .ok_or_else(|| ApiError::invalid_response("Refresh response did not include an access token"))?;

    let stored = tokens
        .rotate_tokens_if_current(used, &access, grant.refresh.as_deref())
        .await?;
    Ok(stored.then_some(access))
}
