//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use skyshot_client::callbacks::{UnauthorizedEvent, UnauthorizedHandler};
use skyshot_client::storage::StorageError;
use skyshot_client::testing::ScriptedTransport;
use skyshot_client::{ApiClient, AuthService, ClientConfig, MemoryStore, SecureStore};

pub const BASE_URL: &str = "https://api.skyshot.test";

/// Records every unauthorized notification
#[derive(Default)]
pub struct RecordingHandler {
    pub events: std::sync::Mutex<Vec<UnauthorizedEvent>>,
    pub calls: AtomicUsize,
}

impl RecordingHandler {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<UnauthorizedEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl UnauthorizedHandler for RecordingHandler {
    async fn call(&self, event: UnauthorizedEvent) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(event);
    }
}

/// Store whose operations can be switched to fail.
///
/// Successful operations land in the wrapped [`MemoryStore`], so tests can
/// inspect exactly what reached durable storage.
#[derive(Default)]
pub struct FailingStore {
    pub inner: Arc<MemoryStore>,
    fail_get: AtomicBool,
    fail_delete: AtomicBool,
    failing_sets: std::sync::Mutex<Vec<String>>,
}

impl FailingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn fail_gets(&self) {
        self.fail_get.store(true, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    /// Make writes to `key` fail
    pub fn fail_sets_to(&self, key: &str) {
        self.failing_sets.lock().unwrap().push(key.to_string());
    }

    fn error(op: &str, key: &str) -> StorageError {
        StorageError::Backend(format!("{op} {key} refused"))
    }
}

#[async_trait]
impl SecureStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Self::error("get", key));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.failing_sets.lock().unwrap().iter().any(|k| k == key) {
            return Err(Self::error("set", key));
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::error("delete", key));
        }
        self.inner.delete(key).await
    }
}

pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<MemoryStore>,
    pub handler: Arc<RecordingHandler>,
    pub client: Arc<ApiClient>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        Self::backed_by(Arc::clone(&store), store)
    }

    /// Harness whose client writes through a [`FailingStore`]; `store` is
    /// the memory behind it.
    pub fn with_failing_store() -> (Self, Arc<FailingStore>) {
        let failing = Arc::new(FailingStore::new(Arc::new(MemoryStore::new())));
        let harness = Self::backed_by(Arc::clone(&failing.inner), Arc::clone(&failing));
        (harness, failing)
    }

    fn backed_by(store: Arc<MemoryStore>, backend: impl SecureStore + 'static) -> Self {
        let transport = Arc::new(ScriptedTransport::new());
        let handler = Arc::new(RecordingHandler::default());

        let client = ApiClient::builder()
            .config(ClientConfig::builder().base_url(BASE_URL).build())
            .transport(Arc::clone(&transport))
            .store(backend)
            .unauthorized_handler(Arc::clone(&handler))
            .build()
            .unwrap();

        Self {
            transport,
            store,
            handler,
            client: Arc::new(client),
        }
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(Arc::clone(&self.client))
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
