use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use perms_core::{BackendError, BackendResult, Filter, InMemoryBackend, PermissionBackend, Triple};
use perms_server::api::{CreateResults, DeleteResults, ReadResults};
use perms_server::build_router;
use perms_test_utils::{Fixtures, READ, WRITE};
use pretty_assertions::assert_eq;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use tower::ServiceExt;

/// Backend whose store is always unreachable
#[derive(Debug)]
struct UnreachableBackend;

fn unreachable() -> BackendError {
    BackendError::connection(
        "unreachable",
        io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
    )
}

#[async_trait]
impl PermissionBackend for UnreachableBackend {
    fn name(&self) -> &'static str {
        "unreachable"
    }

    async fn create(&self, _triples: &[Triple]) -> BackendResult<HashSet<Triple>> {
        Err(unreachable())
    }

    async fn read(&self, _filter: &Filter) -> BackendResult<HashSet<Triple>> {
        Err(unreachable())
    }

    async fn delete(&self, _filter: &Filter) -> BackendResult<HashSet<Triple>> {
        Err(unreachable())
    }

    async fn health_check(&self) -> BackendResult<bool> {
        Err(unreachable())
    }
}

fn memory_app() -> Router {
    build_router(Arc::new(InMemoryBackend::new()))
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn parse<T: DeserializeOwned>(body: Value) -> T {
    serde_json::from_value(body).unwrap()
}

fn triple_json(triple: &Triple) -> Value {
    json!({
        "subject_uuid": triple.subject_uuid,
        "predicate": triple.predicate,
        "object_uuid": triple.object_uuid,
    })
}

fn sorted(mut triples: Vec<Triple>) -> Vec<Triple> {
    triples.sort();
    triples
}

#[tokio::test]
async fn test_create_read_delete_scenario() {
    let app = memory_app();
    let fixtures = Fixtures::new();
    let (s1, s2, o1) = (fixtures.subject_one(), fixtures.subject_two(), fixtures.object_a());
    let a = Triple::new(s1, READ, o1);
    let b = Triple::new(s1, WRITE, o1);
    let c = Triple::new(s2, READ, o1);

    let (status, body) = post(
        &app,
        "/create-perms",
        json!([triple_json(&a), triple_json(&b), triple_json(&c)]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let created: CreateResults = parse(body);
    assert_eq!(created.created, sorted(vec![a.clone(), b.clone(), c.clone()]));

    let (status, body) = post(&app, "/read-perms", json!({ "subject_uuids": [s1] })).await;
    assert_eq!(status, StatusCode::OK);
    let read: ReadResults = parse(body);
    assert_eq!(read.results, sorted(vec![a.clone(), b.clone()]));

    let (_, body) = post(&app, "/read-perms", json!({ "predicates": ["read"] })).await;
    let read: ReadResults = parse(body);
    assert_eq!(read.results, sorted(vec![a.clone(), c.clone()]));

    let (status, body) = post(
        &app,
        "/delete-perms",
        json!({ "subject_uuids": [s1], "predicates": ["write"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let deleted: DeleteResults = parse(body);
    assert_eq!(deleted.deleted, vec![b]);

    let (_, body) = post(&app, "/read-perms", json!({})).await;
    let read: ReadResults = parse(body);
    assert_eq!(read.results, sorted(vec![a, c]));
}

#[tokio::test]
async fn test_null_and_missing_filter_fields_mean_everything() {
    let app = memory_app();
    let fixtures = Fixtures::new();
    let triples = fixtures.sparse();
    let body = Value::Array(triples.iter().map(triple_json).collect());
    post(&app, "/create-perms", body).await;

    let (_, missing) = post(&app, "/read-perms", json!({})).await;
    let (_, nulls) = post(
        &app,
        "/read-perms",
        json!({ "subject_uuids": null, "predicates": null, "object_uuids": null }),
    )
    .await;
    let (_, empty) = post(
        &app,
        "/read-perms",
        json!({ "subject_uuids": [], "predicates": [], "object_uuids": [] }),
    )
    .await;

    let expected = sorted(triples);
    assert_eq!(parse::<ReadResults>(missing).results, expected);
    assert_eq!(parse::<ReadResults>(nulls).results, expected);
    assert_eq!(parse::<ReadResults>(empty).results, expected);
}

#[tokio::test]
async fn test_duplicate_create_reports_once() {
    let app = memory_app();
    let fixtures = Fixtures::new();
    let triple = Triple::new(fixtures.subject_one(), READ, fixtures.object_a());

    let (_, body) = post(&app, "/create-perms", json!([triple_json(&triple), triple_json(&triple)])).await;
    assert_eq!(parse::<CreateResults>(body).created, vec![triple.clone()]);

    // Creating it again still reports it
    let (_, body) = post(&app, "/create-perms", json!([triple_json(&triple)])).await;
    assert_eq!(parse::<CreateResults>(body).created, vec![triple]);
}

#[tokio::test]
async fn test_malformed_uuid_is_rejected_before_the_backend() {
    let backend = Arc::new(InMemoryBackend::new());
    let app = build_router(backend.clone());

    let (status, body) = post(
        &app,
        "/create-perms",
        json!([{ "subject_uuid": "not-a-uuid", "predicate": "read", "object_uuid": "also-not" }]),
    )
    .await;

    assert!(status.is_client_error(), "unexpected status {}", status);
    assert_eq!(body["error"]["code"], "ERR_BAD_REQUEST");
    assert!(backend.is_empty().await);

    let (status, _) = post(&app, "/read-perms", json!({ "subject_uuids": ["nope"] })).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_wrong_shape_and_invalid_json_are_rejected() {
    let app = memory_app();

    let (status, _) = post(&app, "/create-perms", json!({ "subject_uuid": "x" })).await;
    assert!(status.is_client_error());

    let request = Request::builder()
        .method("POST")
        .uri("/delete-perms")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "ERR_BAD_REQUEST");
}

#[tokio::test]
async fn test_backend_failure_is_internal_server_error() {
    let app = build_router(Arc::new(UnreachableBackend));

    let (status, body) = post(&app, "/read-perms", json!({})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "ERR_BACKEND");
    assert_eq!(
        body["error"]["message"],
        "unreachable connection error: connection refused"
    );
}

#[tokio::test]
async fn test_health_reports_backend() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&memory_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "UP", "backend": "memory" }));
}

#[tokio::test]
async fn test_health_is_down_when_backend_fails() {
    let app = build_router(Arc::new(UnreachableBackend));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "DOWN");
    assert_eq!(body["backend"], "unreachable");
}
