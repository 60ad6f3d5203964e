//! End-to-end tests of deferred purging under the supervisor.

use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use library_service::config::FailurePolicy;
use library_service::domain::RecordKind;
use library_service::lifecycle::{fatal_channel, LifecycleError, LifecycleState, Supervisor};
use library_service::storage::{MemoryStore, SqliteStore};
use library_service::LibraryServer;

mod common;

use common::{eventually, start_service, test_config, FailingPurgeStore, PurgeFault};

async fn register(client: &reqwest::Client, url: String, email: &str) -> (String, String) {
    let res = client
        .post(url)
        .json(&json!({ "name": "Reader", "email": email, "pass": "secret-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let token = res.headers()[AUTHORIZATION].to_str().unwrap().to_string();
    let body: Value = res.json().await.unwrap();
    (body["uid"].as_str().unwrap().to_string(), token)
}

#[tokio::test]
async fn test_deleted_books_are_purged_at_threshold() {
    let store = Arc::new(MemoryStore::new());
    let service = start_service(test_config(), store.clone()).await;
    let client = reqwest::Client::new();

    let (_uid, token) = register(&client, service.url("/user/register"), "reader@example.com").await;

    let mut bids = Vec::new();
    for label in ["Dune", "Solaris", "Hyperion"] {
        let res = client
            .post(service.url("/book/add_book"))
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&json!({ "label": label, "author": "Someone" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        bids.push(body["bid"].as_str().unwrap().to_string());
    }

    // One delete is below the threshold of 2: the row stays, soft-deleted.
    let res = client
        .delete(service.url(&format!("/book/delete/{}", bids[0])))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.stored_len(RecordKind::Books), 3);

    let res = client
        .delete(service.url(&format!("/book/delete/{}", bids[1])))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert!(
        eventually(Duration::from_secs(2), || store.stored_len(RecordKind::Books) == 1).await,
        "two soft-deleted books should have been purged"
    );

    let health: Value = client
        .get(service.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["state"], "running");
    assert_eq!(health["pending"]["books"], 0);

    let res = client.get(service.url("/book/all_books")).send().await.unwrap();
    let books: Value = res.json().await.unwrap();
    assert_eq!(books.as_array().unwrap().len(), 1);
    assert_eq!(books[0]["label"], "Hyperion");

    assert!(service.stop().await.is_ok());
}

#[tokio::test]
async fn test_bind_failure_ends_the_run() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = test_config();
    config.listener.bind_address = occupied.local_addr().unwrap().to_string();

    let store = Arc::new(MemoryStore::new());
    let supervisor = Supervisor::new(config.lifecycle.shutdown_timeout());
    let status = supervisor.status();
    let (fatal, errors) = fatal_channel();
    let server = LibraryServer::new(&config, store, status.clone(), fatal);

    let serve = server.run(supervisor.shutdown());
    let result = tokio::time::timeout(
        Duration::from_secs(2),
        supervisor.run(serve, errors, std::future::pending()),
    )
    .await
    .expect("bind failure should end the run promptly");

    assert!(matches!(result, Err(LifecycleError::Bind { .. })));
    assert_eq!(status.get(), LifecycleState::Stopped);
}

#[tokio::test]
async fn test_user_purge_failure_can_be_tolerated() {
    let mut config = test_config();
    config.purge.users = FailurePolicy::LogAndContinue;

    let inner = Arc::new(MemoryStore::new());
    let store = Arc::new(FailingPurgeStore::new(inner.clone(), RecordKind::Users));
    let service = start_service(config, store.clone()).await;
    let client = reqwest::Client::new();

    let (alice, _) = register(&client, service.url("/user/register"), "alice@example.com").await;
    let (bob, _) = register(&client, service.url("/user/register"), "bob@example.com").await;
    for uid in [&alice, &bob] {
        let res = client
            .delete(service.url(&format!("/user/delete/{uid}")))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    assert!(eventually(Duration::from_secs(2), || store.failed_attempts() == 1).await);

    // Still serving; rows stay soft-deleted and hidden.
    assert_eq!(service.status.get(), LifecycleState::Running);
    let res = client.get(service.url("/user/get_all_users")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(inner.stored_len(RecordKind::Users), 2);

    assert!(service.stop().await.is_ok());
}

#[tokio::test]
async fn test_fatal_purge_failure_stops_the_service() {
    let mut config = test_config();
    config.purge.books = FailurePolicy::Fatal;

    let inner = Arc::new(MemoryStore::new());
    let store = Arc::new(FailingPurgeStore::new(inner, RecordKind::Books));
    let service = start_service(config, store.clone()).await;
    let status = service.status.clone();
    let client = reqwest::Client::new();

    let (_uid, token) = register(&client, service.url("/user/register"), "owner@example.com").await;
    for label in ["One", "Two"] {
        let res = client
            .post(service.url("/book/add_book"))
            .header(AUTHORIZATION, token.clone())
            .json(&json!({ "label": label, "author": "Someone" }))
            .send()
            .await
            .unwrap();
        let body: Value = res.json().await.unwrap();
        let bid = body["bid"].as_str().unwrap();
        client
            .delete(service.url(&format!("/book/delete/{bid}")))
            .send()
            .await
            .unwrap();
    }

    let result = service.join().await;
    assert!(matches!(
        result,
        Err(LifecycleError::Purge {
            kind: RecordKind::Books,
            attempts: 1,
            ..
        })
    ));
    assert_eq!(store.failed_attempts(), 1);
    assert_eq!(status.get(), LifecycleState::Stopped);
}

#[tokio::test]
async fn test_purger_panic_fails_the_run() {
    let inner = Arc::new(MemoryStore::new());
    let store = Arc::new(FailingPurgeStore::with_fault(
        inner,
        RecordKind::Books,
        PurgeFault::Panic,
    ));
    let service = start_service(test_config(), store.clone()).await;
    let status = service.status.clone();
    let client = reqwest::Client::new();

    let (_uid, token) = register(&client, service.url("/user/register"), "panic@example.com").await;
    for label in ["One", "Two"] {
        let res = client
            .post(service.url("/book/add_book"))
            .header(AUTHORIZATION, token.clone())
            .json(&json!({ "label": label, "author": "Someone" }))
            .send()
            .await
            .unwrap();
        let body: Value = res.json().await.unwrap();
        let bid = body["bid"].as_str().unwrap();
        client
            .delete(service.url(&format!("/book/delete/{bid}")))
            .send()
            .await
            .unwrap();
    }

    // The dead purger closes the error channel, which alone reads as a
    // clean exit; the serving loop must still report the panic.
    let result = service.join().await;
    assert!(matches!(result, Err(LifecycleError::Task(_))), "{result:?}");
    assert_eq!(store.failed_attempts(), 1);
    assert_eq!(status.get(), LifecycleState::Stopped);
}

#[tokio::test]
async fn test_sqlite_store_purges_at_threshold() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(temp_dir.path().join("library.db")).unwrap());
    let service = start_service(test_config(), store.clone()).await;
    let client = reqwest::Client::new();

    let (alice, _) = register(&client, service.url("/user/register"), "alice@example.com").await;
    let (bob, _) = register(&client, service.url("/user/register"), "bob@example.com").await;
    register(&client, service.url("/user/register"), "carol@example.com").await;

    // Duplicate registration is refused by the unique email index.
    let res = client
        .post(service.url("/user/register"))
        .json(&json!({ "name": "Again", "email": "alice@example.com", "pass": "secret-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    for uid in [&alice, &bob] {
        let res = client
            .delete(service.url(&format!("/user/delete/{uid}")))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    assert!(
        eventually(Duration::from_secs(2), || {
            store.stored_len(RecordKind::Users).unwrap() == 1
        })
        .await,
        "two soft-deleted users should have been purged"
    );

    assert!(service.stop().await.is_ok());
}
