//! Scripted transport for exercising clients without a network
//!
//! ```
//! use skyshot_client::http::{ApiResponse, Method};
//! use skyshot_client::testing::ScriptedTransport;
//!
//! let transport = ScriptedTransport::new();
//! transport.respond(
//!     Method::Get,
//!     "/api/auth/profile/",
//!     ApiResponse::json_body(200, &serde_json::json!({"id": 1})),
//! );
//! assert!(transport.calls().is_empty());
//! ```

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};

use crate::error::Result;
use crate::http::{ApiRequest, ApiResponse, HttpTransport, Method};

type Handler = Arc<dyn Fn(&ApiRequest) -> BoxFuture<'static, Result<ApiResponse>> + Send + Sync>;

struct Route {
    method: Method,
    path: String,
    handler: Handler,
}

/// A request as the transport saw it
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Absolute URL
    pub url: String,
    /// Request including headers at send time
    pub request: ApiRequest,
}

/// Transport answering from registered routes and recording every call.
///
/// Routes match on method and request path. Later registrations for the
/// same route replace earlier ones. Unmatched requests get a JSON `404`.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("routes", &lock(&self.routes).len())
            .field("calls", &lock(&self.calls).len())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedTransport {
    /// Create a transport with no routes
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method path` with the future returned by `handler`
    pub fn on<F, Fut>(&self, method: Method, path: impl Into<String>, handler: F)
    where
        F: Fn(&ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ApiResponse>> + Send + 'static,
    {
        let path = path.into();
        let handler: Handler = Arc::new(move |request: &ApiRequest| handler(request).boxed());

        let mut routes = lock(&self.routes);
        routes.retain(|route| !(route.method == method && route.path == path));
        routes.push(Route { method, path, handler });
    }

    /// Always answer `method path` with `response`
    pub fn respond(&self, method: Method, path: impl Into<String>, response: ApiResponse) {
        self.on(method, path, move |_| {
            let response = response.clone();
            async move { Ok(response) }
        });
    }

    /// Every call so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Calls whose request path is `path`
    #[must_use]
    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.request.path == path)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, url: &str, request: &ApiRequest) -> Result<ApiResponse> {
        lock(&self.calls).push(RecordedCall {
            url: url.to_string(),
            request: request.clone(),
        });

        let handler = lock(&self.routes)
            .iter()
            .find(|route| route.method == request.method && route.path == request.path)
            .map(|route| Arc::clone(&route.handler));

        match handler {
            Some(handler) => handler(request).await,
            None => Ok(ApiResponse::json_body(
                404,
                &serde_json::json!({ "detail": "Not found." }),
            )),
        }
    }
}
