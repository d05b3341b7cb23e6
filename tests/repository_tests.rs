//! Certificate repository behavior against the in-memory store.

mod common;

use std::sync::Arc;

use certificados_server::certificate::id::{RANDOM_ID_MAX, RANDOM_ID_MIN};
use certificados_server::certificate::{canonical_urls, Estado, IdPolicy, RepositoryError};
use common::{certificate, repository, request, InMemoryStore, BASE_URL};

#[tokio::test]
async fn test_create_stores_upper_cased_row_in_proceso() {
    let store = Arc::new(InMemoryStore::new());
    let repo = repository(store.clone());

    let created = repo.create(&request(), IdPolicy::Random).await.unwrap();

    assert!((RANDOM_ID_MIN..=RANDOM_ID_MAX).contains(&created.id));
    assert_eq!(created.id.to_string().len(), 10);
    assert_eq!(created.name, "ANA DIAZ");
    assert_eq!(created.career, "INGENIERÍA EN INFORMÁTICA");
    assert_eq!(created.rut, "17616251-1");
    assert_eq!(created.estado, Estado::EnProceso);
    assert_eq!(created.sede.as_deref(), Some("SEDE CENTRAL"));
    assert_eq!(store.insert_calls(), 1);
}

#[tokio::test]
async fn test_create_sequential_lets_store_assign_id() {
    let store = Arc::new(InMemoryStore::new());
    let repo = repository(store.clone());

    let first = repo.create(&request(), IdPolicy::Sequential).await.unwrap();
    let second = repo.create(&request(), IdPolicy::Sequential).await.unwrap();

    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
}

#[tokio::test]
async fn test_create_invalid_request_makes_no_store_call() {
    let store = Arc::new(InMemoryStore::new());
    let repo = repository(store.clone());
    let mut bad = request();
    bad.rut = "176162511".to_string();

    let result = repo.create(&bad, IdPolicy::Random).await;

    assert!(matches!(result, Err(RepositoryError::Validation(_))));
    assert_eq!(store.insert_calls(), 0);
}

#[tokio::test]
async fn test_create_store_rejection_is_creation_error() {
    let store = Arc::new(InMemoryStore::new());
    store.fail_inserts();
    let repo = repository(store.clone());

    let err = repo.create(&request(), IdPolicy::Random).await.unwrap_err();

    assert!(matches!(err, RepositoryError::Creation(_)));
    assert!(err.to_string().starts_with("Error al crear el certificado"));
}

#[tokio::test]
async fn test_create_without_returned_row_is_creation_error() {
    let store = Arc::new(InMemoryStore::new());
    store.silent_inserts();
    let repo = repository(store);

    let result = repo.create(&request(), IdPolicy::Random).await;

    assert!(matches!(result, Err(RepositoryError::Creation(_))));
}

#[tokio::test]
async fn test_attach_urls_writes_canonical_links() {
    let store = Arc::new(InMemoryStore::new());
    let repo = repository(store.clone());
    let created = repo.create(&request(), IdPolicy::Random).await.unwrap();

    repo.attach_urls(created.id).await.unwrap();

    let stored = store.get(created.id).await.unwrap();
    let expected = canonical_urls(BASE_URL, created.id);
    assert_eq!(stored.qr_url, Some(expected.qr_url));
    assert_eq!(stored.view_url, Some(expected.view_url));
}

#[tokio::test]
async fn test_attach_urls_failure_is_swallowed() {
    let store = Arc::new(InMemoryStore::new());
    let repo = repository(store.clone());
    let created = repo.create(&request(), IdPolicy::Random).await.unwrap();
    store.fail_updates();

    assert!(repo.attach_urls(created.id).await.is_ok());
    assert_eq!(store.update_calls(), 1);
    assert!(store.get(created.id).await.unwrap().qr_url.is_none());
}

#[tokio::test]
async fn test_get_by_id_reconciles_stale_links_once() {
    let store = Arc::new(InMemoryStore::new());
    let mut stale = certificate(4821937465, "17616251-1");
    stale.qr_url = Some("https://old.example.cl/certificado/4821937465".to_string());
    stale.view_url = Some(canonical_urls(BASE_URL, 4821937465).view_url);
    store.put(stale).await;
    let repo = repository(store.clone());

    let found = repo.get_by_id("4821937465").await.unwrap().unwrap();

    let expected = canonical_urls(BASE_URL, 4821937465);
    assert_eq!(found.qr_url.as_deref(), Some(expected.qr_url.as_str()));
    assert_eq!(found.view_url.as_deref(), Some(expected.view_url.as_str()));
    assert!(store.wait_for_updates(1).await);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(store.update_calls(), 1);
    assert_eq!(
        store.get(4821937465).await.unwrap().qr_url,
        Some(expected.qr_url)
    );
}

#[tokio::test]
async fn test_get_by_id_with_canonical_links_writes_nothing() {
    let store = Arc::new(InMemoryStore::new());
    let mut current = certificate(42, "17616251-1");
    let urls = canonical_urls(BASE_URL, 42);
    current.qr_url = Some(urls.qr_url);
    current.view_url = Some(urls.view_url);
    store.put(current.clone()).await;
    let repo = repository(store.clone());

    let found = repo.get_by_id("42").await.unwrap().unwrap();

    assert_eq!(found, current);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(store.update_calls(), 0);
}

#[tokio::test]
async fn test_get_by_id_malformed_or_missing_is_none() {
    let store = Arc::new(InMemoryStore::new());
    let repo = repository(store.clone());

    assert!(repo.get_by_id("abc").await.unwrap().is_none());
    assert!(repo.get_by_id("-5").await.unwrap().is_none());
    assert_eq!(store.select_calls(), 0);

    assert!(repo.get_by_id("999").await.unwrap().is_none());
    assert_eq!(store.select_calls(), 1);
}

#[tokio::test]
async fn test_get_by_id_transport_failure_is_fetch_error() {
    let store = Arc::new(InMemoryStore::new());
    store.fail_selects();
    let repo = repository(store);

    let result = repo.get_by_id("42").await;

    assert!(matches!(result, Err(RepositoryError::Fetch(_))));
}

#[tokio::test]
async fn test_find_by_rut_exact_match() {
    let store = Arc::new(InMemoryStore::new());
    store.put(certificate(1, "17616251-1")).await;
    store.put(certificate(2, "17616251-1")).await;
    store.put(certificate(3, "9130489-9")).await;
    let repo = repository(store);

    let first = repo.find_by_rut("17616251-1").await.unwrap();
    let second = repo.find_by_rut("17616251-1").await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert!(repo.find_by_rut("17.616.251-1").await.unwrap().is_empty());
    assert!(repo.find_by_rut("11111111-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_mark_paid_sets_pagado() {
    let store = Arc::new(InMemoryStore::new());
    store.put(certificate(7, "17616251-1")).await;
    let repo = repository(store.clone());

    repo.mark_paid(7).await.unwrap();

    assert_eq!(store.get(7).await.unwrap().estado, Estado::Pagado);
}

#[tokio::test]
async fn test_list_all_newest_first() {
    let store = Arc::new(InMemoryStore::new());
    let mut older = certificate(1, "17616251-1");
    older.created_at = chrono::DateTime::parse_from_rfc3339("2023-01-01T00:00:00Z")
        .ok()
        .map(|d| d.to_utc());
    store.put(older).await;
    store.put(certificate(2, "9130489-9")).await;
    let repo = repository(store);

    let all = repo.list_all().await.unwrap();

    assert_eq!(all.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 1]);
}
