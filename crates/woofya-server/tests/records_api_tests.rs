//! Record API status codes and bodies, driven through the full router

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use woofya_common::store::RecordStore;
use woofya_common::types::IdentityPolicy;
use woofya_server::api::{create_router, AppState};
use woofya_server::config::Config;

fn app(store: &RecordStore) -> Router {
    create_router(
        AppState {
            store: store.clone(),
        },
        &Config::default(),
    )
}

fn store() -> RecordStore {
    RecordStore::in_memory(IdentityPolicy::default())
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&value).unwrap())
        },
        None => Body::empty(),
    };

    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(store: &RecordStore, body: Value) -> Value {
    let (status, value) = send(app(store), Method::POST, "/records", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{value}");
    value
}

fn dog_day() -> Value {
    json!({
        "title": "Dog Day",
        "location": "Sydney, NSW",
        "date": "2024-10-01",
        "features": ["off-leash"],
        "source_ids": ["eventbrite"]
    })
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_returns_201_with_id() {
    let store = store();
    let created = create(&store, dog_day()).await;

    assert!(created["id"].is_string());
    assert_eq!(created["title"], "Dog Day");
    assert_eq!(created["date"], "2024-10-01");
    assert_eq!(created["description"], "");
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_duplicate_create_conflicts() {
    let store = store();
    create(&store, dog_day()).await;

    let (status, body) = send(app(&store), Method::POST, "/records", Some(dog_day())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already exists"));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_upsert_merges_into_existing() {
    let store = store();
    let created = create(&store, dog_day()).await;

    let mut again = dog_day();
    again["features"] = json!(["water bowls"]);
    again["source_ids"] = json!(["yappack"]);
    again["description"] = json!("ignored, first seen wins");

    let (status, merged) =
        send(app(&store), Method::POST, "/records?upsert=true", Some(again)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(merged["id"], created["id"]);
    assert_eq!(merged["features"], json!(["off-leash", "water bowls"]));
    assert_eq!(merged["source_ids"], json!(["eventbrite", "yappack"]));
    assert_eq!(merged["description"], "");
}

#[tokio::test]
async fn test_create_rejects_missing_or_blank_title() {
    let store = store();

    let (status, body) = send(
        app(&store),
        Method::POST,
        "/records",
        Some(json!({"location": "Sydney, NSW"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        app(&store),
        Method::POST,
        "/records",
        Some(json!({"title": "  ", "location": "Sydney, NSW"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Title"));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_create_rejects_malformed_date() {
    let store = store();
    let (status, body) = send(
        app(&store),
        Method::POST,
        "/records",
        Some(json!({"title": "Dog Day", "location": "Sydney, NSW", "date": "October 1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

// ============================================================================
// Read
// ============================================================================

#[tokio::test]
async fn test_get_and_list() {
    let store = store();
    let created = create(&store, dog_day()).await;
    create(&store, json!({"title": "Puppy Social", "location": "Melbourne, VIC"})).await;

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(app(&store), Method::GET, &format!("/records/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, listed) = send(app(&store), Method::GET, "/records", None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<_> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Dog Day", "Puppy Social"]);

    let (_, filtered) =
        send(app(&store), Method::GET, "/records?location=melbourne,%20vic", None).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_and_malformed_ids_are_404() {
    let store = store();

    let (status, body) = send(
        app(&store),
        Method::GET,
        &format!("/records/{}", uuid::Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, body) = send(app(&store), Method::GET, "/records/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not-a-uuid"));
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_partial_update() {
    let store = store();
    let created = create(&store, dog_day()).await;
    let uri = format!("/records/{}", created["id"].as_str().unwrap());

    let (status, updated) = send(
        app(&store),
        Method::PUT,
        &uri,
        Some(json!({"description": "Bring a lead", "date": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["title"], "Dog Day");
    assert_eq!(updated["description"], "Bring a lead");
    assert_eq!(updated["date"], Value::Null);
    assert_eq!(updated["features"], json!(["off-leash"]));
}

#[tokio::test]
async fn test_update_errors() {
    let store = store();
    let first = create(&store, dog_day()).await;
    let second = create(&store, json!({"title": "Yappy Hour", "location": "Brisbane, QLD"})).await;

    let missing = format!("/records/{}", uuid::Uuid::new_v4());
    let (status, _) =
        send(app(&store), Method::PUT, &missing, Some(json!({"title": "Anything"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/records/{}", second["id"].as_str().unwrap());
    let (status, body) = send(app(&store), Method::PUT, &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        app(&store),
        Method::PUT,
        &uri,
        Some(json!({"title": "dog day", "date": first["date"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, unchanged) = send(app(&store), Method::GET, &uri, None).await;
    assert_eq!(unchanged["title"], "Yappy Hour");
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_then_404() {
    let store = store();
    let created = create(&store, dog_day()).await;
    let uri = format!("/records/{}", created["id"].as_str().unwrap());

    let (status, body) = send(app(&store), Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (status, _) = send(app(&store), Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(app(&store), Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Health, stats and prefixes
// ============================================================================

#[tokio::test]
async fn test_stats_counts_per_location() {
    let store = store();
    create(&store, dog_day()).await;
    create(&store, json!({"title": "Dog Beach", "location": "Sydney, NSW"})).await;
    create(&store, json!({"title": "Puppy Social", "location": "Melbourne, VIC"})).await;

    let (status, stats) = send(app(&store), Method::GET, "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["by_location"]["Sydney, NSW"], 2);
    assert_eq!(stats["by_location"]["Melbourne, VIC"], 1);
}

#[tokio::test]
async fn test_routes_are_also_mounted_under_api_v1() {
    let store = store();

    let (status, created) =
        send(app(&store), Method::POST, "/api/v1/records", Some(dog_day())).await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/v1/records/{}", created["id"].as_str().unwrap());
    let (status, _) = send(app(&store), Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, stats) = send(app(&store), Method::GET, "/api/v1/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 1);

    let (status, health) = send(app(&store), Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["records"], 1);
}

#[tokio::test]
async fn test_writes_reach_the_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.json");
    let store = RecordStore::open(&path, IdentityPolicy::default()).await.unwrap();
    let created = create(&store, dog_day()).await;

    let reopened = RecordStore::open(&path, IdentityPolicy::default()).await.unwrap();
    let id = uuid::Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();
    assert_eq!(reopened.get(id).await.unwrap().record.title, "Dog Day");

    let (_, health) = send(app(&store), Method::GET, "/health", None).await;
    assert_eq!(health["storage"], "snapshot");
}
