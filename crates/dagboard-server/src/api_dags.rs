//! DAG record API handlers.
//!
//! Each handler checks one pooled connection out inside `spawn_blocking`
//! and returns it when the closure ends. Absent records are ordinary
//! results: `load-dag` answers `null` and `delete-dag` reports
//! `"not found"`, both with `200 OK`.

use crate::AppState;
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dagboard_dags::{delete_dag, get_dag, list_dags, upsert_dag, DagError, DagRecord, DagSummary};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DagApiError {
    #[error("internal server error: {0}")]
    Internal(String),
}

impl From<DagError> for DagApiError {
    fn from(e: DagError) -> Self {
        DagApiError::Internal(e.to_string())
    }
}

impl IntoResponse for DagApiError {
    fn into_response(self) -> Response {
        let DagApiError::Internal(message) = self;
        tracing::error!(error = %message, "dag request failed");

        let body = Json(serde_json::json!({
            "error": message
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Query string carrying a record id.
#[derive(Debug, Deserialize)]
pub struct DagIdParams {
    pub id: String,
}

/// Body of `POST /api/save-dag`.
#[derive(Debug, Deserialize)]
pub struct SaveDagRequest {
    pub id: String,
    pub name: String,
    pub data: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl StatusResponse {
    fn ok() -> Self {
        Self { status: "ok" }
    }
}

/// Runs `f` against a pooled connection on the blocking thread pool.
async fn with_conn<T, F>(state: &AppState, f: F) -> Result<T, DagApiError>
where
    F: FnOnce(&Connection) -> Result<T, DagError> + Send + 'static,
    T: Send + 'static,
{
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| DagApiError::Internal(format!("db connection failed: {}", e)))?;
        f(&conn).map_err(DagApiError::from)
    })
    .await
    .map_err(|e| DagApiError::Internal(format!("task join error: {}", e)))?
}

/// Handler for `GET /api/dag-list`.
pub async fn list_dags_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<DagSummary>>, DagApiError> {
    let dags = with_conn(&state, list_dags).await?;
    Ok(Json(dags))
}

/// Handler for `GET /api/load-dag?id=`.
pub async fn load_dag_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<DagIdParams>,
) -> Result<Json<Option<DagRecord>>, DagApiError> {
    let record = with_conn(&state, move |conn| get_dag(conn, &params.id)).await?;
    Ok(Json(record))
}

/// Handler for `POST /api/save-dag`.
pub async fn save_dag_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<SaveDagRequest>,
) -> Result<Json<StatusResponse>, DagApiError> {
    let record = DagRecord {
        id: payload.id,
        name: payload.name,
        data: payload.data,
    };
    with_conn(&state, move |conn| upsert_dag(conn, &record)).await?;
    Ok(Json(StatusResponse::ok()))
}

/// Handler for `DELETE /api/delete-dag?id=`.
pub async fn delete_dag_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<DagIdParams>,
) -> Result<Json<StatusResponse>, DagApiError> {
    let outcome = with_conn(&state, move |conn| delete_dag(conn, &params.id)).await?;
    Ok(Json(StatusResponse {
        status: outcome.as_status(),
    }))
}
