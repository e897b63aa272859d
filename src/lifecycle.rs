//! Explicit shutdown hooks
//!
//! The host application owns the client's lifetime and calls
//! [`crate::ApiClient::shutdown`] when it is going away. Cleanup registered
//! here runs exactly once at that point, in reverse registration order.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

type Disposer = Box<dyn FnOnce() + Send>;

/// Set of one-shot cleanup callbacks plus a cancellation token that fires on
/// disposal.
#[derive(Default)]
pub struct Disposers {
    token: CancellationToken,
    pending: Mutex<Vec<(&'static str, Disposer)>>,
}

impl std::fmt::Debug for Disposers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposers")
            .field("disposed", &self.is_disposed())
            .field("pending", &self.lock().len())
            .finish()
    }
}

impl Disposers {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(&'static str, Disposer)>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a cleanup callback.
    ///
    /// Registering after disposal runs the callback immediately.
    pub fn register(&self, name: &'static str, disposer: impl FnOnce() + Send + 'static) {
        if self.is_disposed() {
            tracing::debug!(disposer = name, "Running disposer registered after shutdown");
            disposer();
            return;
        }
        self.lock().push((name, Box::new(disposer)));
    }

    /// Run every registered callback once and cancel the token.
    ///
    /// Returns how many callbacks ran. Later calls are no-ops.
    pub fn dispose(&self) -> usize {
        self.token.cancel();
        let pending = std::mem::take(&mut *self.lock());
        let count = pending.len();
        for (name, disposer) in pending.into_iter().rev() {
            tracing::debug!(disposer = name, "Running disposer");
            disposer();
        }
        count
    }

    /// Whether [`Disposers::dispose`] has been called
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token cancelled on disposal; hand child tokens to background tasks.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_dispose_runs_once_in_reverse_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let disposers = Disposers::new();

        for name in ["first", "second"] {
            let order = Arc::clone(&order);
            disposers.register(name, move || order.lock().unwrap().push(name));
        }

        assert_eq!(disposers.dispose(), 2);
        assert_eq!(disposers.dispose(), 0);
        assert_eq!(*order.lock().unwrap(), vec!["second", "first"]);
    }

    #[test]
    fn test_register_after_dispose_runs_immediately() {
        let disposers = Disposers::new();
        let token = disposers.token();
        disposers.dispose();
        assert!(token.is_cancelled());

        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        disposers.register("late", move || *flag.lock().unwrap() = true);
        assert!(*ran.lock().unwrap());
    }
}
