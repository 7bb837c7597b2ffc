use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use dagboard_db::{open, DbPool, DbRuntimeSettings};
use dagboard_server::{app, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup_app_with_limit(max_body_bytes: Option<usize>) -> (Router, DbPool, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("dag.db");
    let pool = open(db_path.to_str().unwrap(), DbRuntimeSettings::default()).unwrap();

    let state =
        AppState::new(pool.clone(), dir.path().join("dist")).with_max_body_bytes(max_body_bytes);

    (app(state), pool, dir)
}

fn setup_app() -> (Router, DbPool, tempfile::TempDir) {
    setup_app_with_limit(None)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn save_request(body: Value) -> Request<Body> {
    Request::builder()
        .uri("/api/save-dag")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("DELETE")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn save_then_load_round_trips() {
    let (app, _pool, _dir) = setup_app();

    let (status, json) = send(
        &app,
        save_request(json!({"id": "d1", "name": "Test", "data": "{}"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "ok"}));

    let (status, json) = send(&app, get_request("/api/load-dag?id=d1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"id": "d1", "name": "Test", "data": "{}"}));

    let (status, json) = send(&app, get_request("/api/dag-list")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!([{"id": "d1", "name": "Test"}]));
}

#[tokio::test]
async fn load_missing_returns_null() {
    let (app, _pool, _dir) = setup_app();

    let (status, json) = send(&app, get_request("/api/load-dag?id=ghost")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, Value::Null);
}

#[tokio::test]
async fn saving_same_id_twice_replaces() {
    let (app, pool, _dir) = setup_app();

    send(
        &app,
        save_request(json!({"id": "d1", "name": "Old", "data": "{\"nodes\":[]}"})),
    )
    .await;
    send(
        &app,
        save_request(json!({"id": "d1", "name": "New", "data": "{\"nodes\":[1]}"})),
    )
    .await;

    let (_, json) = send(&app, get_request("/api/dag-list")).await;
    assert_eq!(json, json!([{"id": "d1", "name": "New"}]));

    let (_, json) = send(&app, get_request("/api/load-dag?id=d1")).await;
    assert_eq!(json["data"], "{\"nodes\":[1]}");

    let conn = pool.get().unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM dag_graphs", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn list_omits_payload() {
    let (app, _pool, _dir) = setup_app();

    let big = "x".repeat(10_000);
    send(&app, save_request(json!({"id": "a", "name": "A", "data": big}))).await;
    send(&app, save_request(json!({"id": "b", "name": "B", "data": "[]"}))).await;

    let (_, json) = send(&app, get_request("/api/dag-list")).await;
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    for entry in entries {
        let keys: Vec<&String> = entry.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
        assert!(entry.get("data").is_none());
    }
    assert_eq!(entries[0]["id"], "a");
    assert_eq!(entries[1]["id"], "b");
}

#[tokio::test]
async fn large_payload_saves_and_reloads() {
    let (app, _pool, _dir) = setup_app();

    // Past both the old 2 MiB layer and axum's default `Json` cap.
    let data = "x".repeat(3 * 1024 * 1024);
    let (status, json) = send(
        &app,
        save_request(json!({"id": "big", "name": "Big", "data": &data})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "ok"}));

    let (status, json) = send(&app, get_request("/api/load-dag?id=big")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_str().unwrap().len(), data.len());
    assert_eq!(json["data"], data);
}

#[tokio::test]
async fn configured_body_cap_is_enforced() {
    let (app, _pool, _dir) = setup_app_with_limit(Some(1024));

    let (status, _) = send(
        &app,
        save_request(json!({"id": "d1", "name": "Small", "data": "{}"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        save_request(json!({"id": "d2", "name": "Large", "data": "x".repeat(4096)})),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (_, json) = send(&app, get_request("/api/dag-list")).await;
    assert_eq!(json, json!([{"id": "d1", "name": "Small"}]));
}

#[tokio::test]
async fn delete_missing_reports_not_found() {
    let (app, _pool, _dir) = setup_app();

    let (status, json) = send(&app, delete_request("/api/delete-dag?id=nope")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "not found"}));
}

#[tokio::test]
async fn delete_existing_removes_from_list() {
    let (app, _pool, _dir) = setup_app();

    send(&app, save_request(json!({"id": "d1", "name": "One", "data": "{}"}))).await;
    send(&app, save_request(json!({"id": "d2", "name": "Two", "data": "{}"}))).await;

    let (status, json) = send(&app, delete_request("/api/delete-dag?id=d1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "ok"}));

    let (_, json) = send(&app, get_request("/api/dag-list")).await;
    assert_eq!(json, json!([{"id": "d2", "name": "Two"}]));

    let (_, json) = send(&app, delete_request("/api/delete-dag?id=d1")).await;
    assert_eq!(json, json!({"status": "not found"}));
}

#[tokio::test]
async fn malformed_payload_is_accepted_verbatim() {
    let (app, _pool, _dir) = setup_app();

    let (status, _) = send(
        &app,
        save_request(json!({"id": "bad", "name": "Bad", "data": "{{{ not json"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&app, get_request("/api/load-dag?id=bad")).await;
    assert_eq!(json["data"], "{{{ not json");
}

#[tokio::test]
async fn missing_fields_are_rejected_by_extractors() {
    let (app, _pool, _dir) = setup_app();

    let (status, _) = send(&app, save_request(json!({"id": "d1", "name": "No data"}))).await;
    assert!(status.is_client_error(), "got {status}");

    let (status, _) = send(&app, get_request("/api/load-dag")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, delete_request("/api/delete-dag")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn storage_failure_is_internal_error() {
    let (app, pool, _dir) = setup_app();
    {
        let conn = pool.get().unwrap();
        conn.execute_batch("DROP TABLE dag_graphs;").unwrap();
    }

    let (status, json) = send(&app, get_request("/api/dag-list")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("dag_graphs"));
}
