//! Trait-based callback definitions.
//!
//! The host application supplies an [`UnauthorizedHandler`] to learn when a
//! request failed authorization and could not be recovered by a token
//! refresh, typically to drop back to the login screen.
//!
//! # Example: Implementing `UnauthorizedHandler`
//!
//! ```no_run
//! use skyshot_client::callbacks::{UnauthorizedEvent, UnauthorizedHandler};
//! use async_trait::async_trait;
//!
//! struct ForceLogin;
//!
//! #[async_trait]
//! impl UnauthorizedHandler for ForceLogin {
//!     async fn call(&self, event: UnauthorizedEvent) {
//!         println!("Session expired on {} {}", event.method, event.endpoint);
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::http::Method;

/// Details of a request that ended in an unrecoverable `401`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizedEvent {
    /// HTTP method of the failed request
    pub method: Method,
    /// Endpoint path of the failed request
    pub endpoint: String,
    /// Whether the request had already been retried after a refresh
    pub retried: bool,
}

// ============================================================================
// Unauthorized Handler Trait
// ============================================================================

/// Trait for unauthorized callbacks.
///
/// Called after the client has given up on a `401`: the request was already
/// retried, no refresh token was available, or the refresh failed.
#[async_trait]
pub trait UnauthorizedHandler: Send + Sync {
    /// Called once per request that ends in an unrecoverable `401`.
    async fn call(&self, event: UnauthorizedEvent);
}

// Blanket implementation for boxed trait objects
#[async_trait]
impl UnauthorizedHandler for Box<dyn UnauthorizedHandler> {
    async fn call(&self, event: UnauthorizedEvent) {
        (**self).call(event).await;
    }
}

#[async_trait]
impl<T: UnauthorizedHandler + ?Sized> UnauthorizedHandler for Arc<T> {
    async fn call(&self, event: UnauthorizedEvent) {
        (**self).call(event).await;
    }
}

/// Type alias for a shared unauthorized handler.
pub type SharedUnauthorizedHandler = Arc<dyn UnauthorizedHandler>;

// ============================================================================
// Closure-based callback wrapper
// ============================================================================

/// Wrapper to convert a closure into an `UnauthorizedHandler`.
///
/// # Example
///
/// ```no_run
/// use skyshot_client::callbacks::{FnUnauthorizedHandler, UnauthorizedHandler};
/// use std::sync::Arc;
///
/// let handler = FnUnauthorizedHandler::new(|event| {
///     Box::pin(async move {
///         println!("Signed out after {}", event.endpoint);
///     })
/// });
///
/// let shared: Arc<dyn UnauthorizedHandler> = Arc::new(handler);
/// ```
pub struct FnUnauthorizedHandler<F>
where
    F: Fn(UnauthorizedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync,
{
    func: F,
}

impl<F> FnUnauthorizedHandler<F>
where
    F: Fn(UnauthorizedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync,
{
    /// Create a new function-based unauthorized handler.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> UnauthorizedHandler for FnUnauthorizedHandler<F>
where
    F: Fn(UnauthorizedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync,
{
    async fn call(&self, event: UnauthorizedEvent) {
        (self.func)(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl UnauthorizedHandler for CountingHandler {
        async fn call(&self, _event: UnauthorizedEvent) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn event() -> UnauthorizedEvent {
        UnauthorizedEvent {
            method: Method::Get,
            endpoint: "/api/auth/profile/".to_string(),
            retried: false,
        }
    }

    #[tokio::test]
    async fn test_arc_wrapped_handler() {
        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
        });
        let shared: SharedUnauthorizedHandler = handler.clone();

        shared.call(event()).await;
        shared.call(event()).await;
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fn_unauthorized_handler() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let handler = FnUnauthorizedHandler::new(move |event| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                assert_eq!(event.endpoint, "/api/auth/profile/");
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });

        handler.call(event()).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
