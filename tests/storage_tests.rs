//! Integration tests for token storage when the secure store misbehaves

mod common;

use common::Harness;
use serde_json::{Value, json};
use skyshot_client::auth::REFRESH_PATH;
use skyshot_client::storage::{StorageError, keys};
use skyshot_client::{ApiError, ApiResponse, Method, SecureStore, TokenPair};
use tokio_test::{assert_err, assert_ok};

const JOBS: &str = "/api/jobs/";

// ============================================================================
// Errors propagate
// ============================================================================

#[tokio::test]
async fn test_load_propagates_read_errors() {
    let (h, store) = Harness::with_failing_store();
    store.fail_gets();

    let err = assert_err!(h.client.tokens().load_stored_tokens().await);
    assert!(matches!(err, StorageError::Backend(_)));

    let err = assert_err!(h.auth().restore_session().await);
    assert!(matches!(err, ApiError::Storage(_)));
}

#[tokio::test]
async fn test_persist_propagates_write_errors() {
    let (h, store) = Harness::with_failing_store();
    store.fail_sets_to(keys::ACCESS_TOKEN);

    assert_err!(h.client.tokens().persist_tokens(&TokenPair::new("a1", "r1")).await);

    assert!(h.client.tokens().snapshot().await.is_empty());
    assert!(h.store.keys().await.is_empty());
}

#[tokio::test]
async fn test_partial_persist_keeps_memory_in_step_with_storage() {
    let (h, store) = Harness::with_failing_store();
    let tokens = h.client.tokens();
    assert_ok!(tokens.persist_tokens(&TokenPair::new("a1", "r1")).await);

    store.fail_sets_to(keys::REFRESH_TOKEN);
    assert_err!(tokens.persist_tokens(&TokenPair::new("a2", "r2")).await);

    let snapshot = tokens.snapshot().await;
    assert_eq!(snapshot.access.as_deref(), Some("a2"));
    assert_eq!(snapshot.refresh.as_deref(), Some("r1"));
    assert_eq!(h.store.get(keys::ACCESS_TOKEN).await.unwrap(), snapshot.access);
    assert_eq!(h.store.get(keys::REFRESH_TOKEN).await.unwrap(), snapshot.refresh);
}

#[tokio::test]
async fn test_clear_propagates_delete_errors_after_clearing_memory() {
    let (h, store) = Harness::with_failing_store();
    let tokens = h.client.tokens();
    assert_ok!(tokens.persist_tokens(&TokenPair::new("a1", "r1")).await);

    store.fail_deletes();
    let err = assert_err!(tokens.clear_stored_tokens().await);

    assert!(matches!(err, StorageError::Backend(ref m) if m.contains(keys::ACCESS_TOKEN)));
    assert!(tokens.snapshot().await.is_empty());

    assert!(h.auth().sign_out().await.is_err());
}

// ============================================================================
// Refresh failure is best-effort about storage
// ============================================================================

#[tokio::test]
async fn test_refresh_failure_with_broken_storage_still_signs_out() {
    let (h, store) = Harness::with_failing_store();
    assert_ok!(h.client.tokens().persist_tokens(&TokenPair::new("stale", "r1")).await);
    store.fail_deletes();

    h.transport.respond(
        Method::Get,
        JOBS,
        ApiResponse::json_body(401, &json!({"detail": "Given token not valid for any token type"})),
    );
    h.transport.respond(
        Method::Post,
        REFRESH_PATH,
        ApiResponse::json_body(401, &json!({"detail": "Token is blacklisted"})),
    );

    let err = assert_err!(h.client.get_json::<Value>(JOBS).await);

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.first_message(), Some("Given token not valid for any token type"));
    assert_eq!(h.handler.count(), 1);
    assert_eq!(h.transport.calls_to(REFRESH_PATH).len(), 1);

    // Memory is cleared even though storage could not be
    assert!(h.client.tokens().snapshot().await.is_empty());
    assert_eq!(h.store.get(keys::REFRESH_TOKEN).await.unwrap().as_deref(), Some("r1"));
    assert!(!h.client.refresher().is_refreshing());
}
