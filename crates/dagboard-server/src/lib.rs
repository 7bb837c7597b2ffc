//! dagboard server library logic.

pub mod api_dags;
pub mod api_qa;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use dagboard_db::DbPool;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Directory of the prebuilt frontend bundle.
    pub static_dir: PathBuf,
    /// Request body cap in bytes; `None` accepts bodies of any size.
    pub max_body_bytes: Option<usize>,
}

impl AppState {
    /// State with no body cap.
    pub fn new(pool: DbPool, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            static_dir: static_dir.into(),
            max_body_bytes: None,
        }
    }

    pub fn with_max_body_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
///
/// The frontend bundle is installed as the fallback service, so every route
/// registered here takes precedence over a static file at the same path no
/// matter the order of registration.
pub fn app(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/api/dag-list", get(api_dags::list_dags_handler))
        .route("/api/load-dag", get(api_dags::load_dag_handler))
        .route("/api/save-dag", post(api_dags::save_dag_handler))
        .route("/api/delete-dag", delete(api_dags::delete_dag_handler))
        .route("/api/ai-qa", post(api_qa::ai_qa_handler));

    let router = with_static_files(router, &state.static_dir);

    // Also lifts axum's built-in 2 MB cap on the `Json` extractor.
    let body_limit = match state.max_body_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    router
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}

/// Serves `static_dir` for every path no route claims. Directory requests get
/// their `index.html`; a bundled `404.html` is used for misses when present.
fn with_static_files(router: Router, static_dir: &std::path::Path) -> Router {
    if !static_dir.is_dir() {
        tracing::warn!(
            path = %static_dir.display(),
            "static directory not found, skipping frontend serving"
        );
        return router;
    }

    tracing::info!(path = %static_dir.display(), "serving frontend static files");

    let not_found = static_dir.join("404.html");
    if not_found.is_file() {
        router.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(not_found)),
        )
    } else {
        router.fallback_service(ServeDir::new(static_dir))
    }
}
