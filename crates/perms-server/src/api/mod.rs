//! RPC style HTTP API.
//!
//! Bulk create and filtered delete do not map well onto resource URLs, so
//! every operation is a POST carrying its triples or filter in the body.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use perms_core::{Filter, PermissionBackend, Triple};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

pub mod errors;
pub mod health;

pub use errors::ApiError;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn PermissionBackend>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CreateResults {
    pub created: Vec<Triple>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ReadResults {
    pub results: Vec<Triple>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DeleteResults {
    pub deleted: Vec<Triple>,
}

/// Backends return sets; responses are sorted so output is stable
fn sorted(triples: HashSet<Triple>) -> Vec<Triple> {
    let mut triples: Vec<Triple> = triples.into_iter().collect();
    triples.sort();
    triples
}

/// Build the router for API endpoints
pub fn build_router(backend: Arc<dyn PermissionBackend>) -> Router {
    Router::new()
        .route("/create-perms", post(create_perms))
        .route("/read-perms", post(read_perms))
        .route("/delete-perms", post(delete_perms))
        .route("/health", get(health::health_check))
        .with_state(AppState { backend })
}

#[instrument(skip_all)]
async fn create_perms(
    State(state): State<AppState>,
    payload: Result<Json<Vec<Triple>>, JsonRejection>,
) -> Result<Json<CreateResults>, ApiError> {
    let Json(triples) = payload?;
    let created = state.backend.create(&triples).await?;

    info!(requested = triples.len(), created = created.len(), "create-perms");
    Ok(Json(CreateResults { created: sorted(created) }))
}

#[instrument(skip_all)]
async fn read_perms(
    State(state): State<AppState>,
    payload: Result<Json<Filter>, JsonRejection>,
) -> Result<Json<ReadResults>, ApiError> {
    let Json(filter) = payload?;
    let results = state.backend.read(&filter).await?;

    info!(results = results.len(), "read-perms");
    Ok(Json(ReadResults { results: sorted(results) }))
}

#[instrument(skip_all)]
async fn delete_perms(
    State(state): State<AppState>,
    payload: Result<Json<Filter>, JsonRejection>,
) -> Result<Json<DeleteResults>, ApiError> {
    let Json(filter) = payload?;
    let deleted = state.backend.delete(&filter).await?;

    info!(deleted = deleted.len(), "delete-perms");
    Ok(Json(DeleteResults { deleted: sorted(deleted) }))
}
