//! HTTP adapter for the Rapport core.
//!
//! # Responsibility
//! - Map JSON routes onto core services.
//! - Run blocking work (SQLite, outbound completions) off the async runtime.
//!
//! # Invariants
//! - Every request opens its own SQLite connection on the blocking pool.
//! - Every error body has the shape `{"detail": ..., "code": ...}`.

mod error;
mod handlers;

pub use error::{ApiError, ApiJson, ApiResult};

use axum::routing::{delete, get, post};
use axum::Router;
use rapport_core::db::open_db;
use rapport_core::llm::build_chain;
use rapport_core::llm::chain::{ProviderChain, ProviderChainError};
use rapport_core::{AppConfig, ServiceResult};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared per-process state; cheap to clone into each request.
#[derive(Clone)]
pub struct AppState {
    db_path: Arc<PathBuf>,
    extract_chain: ProviderChain,
    compare_chain: ProviderChain,
}

impl AppState {
    pub fn new(
        db_path: impl Into<PathBuf>,
        extract_chain: ProviderChain,
        compare_chain: ProviderChain,
    ) -> Self {
        Self {
            db_path: Arc::new(db_path.into()),
            extract_chain,
            compare_chain,
        }
    }

    /// Builds both provider chains from the text-generation settings.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderChainError> {
        Ok(Self::new(
            config.db_path.clone(),
            build_chain(&config.llm, config.llm.extract_timeout())?,
            build_chain(&config.llm, config.llm.compare_timeout())?,
        ))
    }

    pub fn db_path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub fn extract_chain(&self) -> &ProviderChain {
        &self.extract_chain
    }

    pub fn compare_chain(&self) -> &ProviderChain {
        &self.compare_chain
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/extract", post(handlers::extract))
        .route("/extract/check-name", post(handlers::check_name))
        .route("/extract/compare", post(handlers::compare))
        .route("/confirm", post(handlers::confirm))
        .route("/persons", get(handlers::list_persons))
        .route(
            "/persons/:id",
            get(handlers::get_person)
                .put(handlers::update_person)
                .delete(handlers::delete_person),
        )
        .route(
            "/persons/:id/events/:event_id",
            delete(handlers::delete_event),
        )
        .route(
            "/persons/:id/annotations/:annotation_id",
            delete(handlers::delete_annotation),
        )
        .route(
            "/persons/:id/developments/:development_id",
            delete(handlers::delete_development),
        )
        .route(
            "/persons/:id/relations",
            get(handlers::list_relations).post(handlers::create_relation),
        )
        .route(
            "/persons/:id/relations/:other_id",
            delete(handlers::delete_relation),
        )
        .route("/persons/:id/circles", get(handlers::person_circles))
        .route("/graph", get(handlers::graph))
        .route(
            "/graph/layout",
            get(handlers::load_layout).post(handlers::save_layout),
        )
        .route(
            "/circles",
            get(handlers::list_circles).post(handlers::create_circle),
        )
        .route("/circles/members", get(handlers::circles_with_members))
        .route("/circles/:id", delete(handlers::delete_circle))
        .route("/circles/:id/members", post(handlers::add_member))
        .route(
            "/circles/:id/members/:person_id",
            delete(handlers::remove_member),
        )
        .with_state(state)
}

/// Runs `work` on the blocking pool with a fresh connection.
pub(crate) async fn with_db<T, F>(state: &AppState, work: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Connection, &AppState) -> ServiceResult<T> + Send + 'static,
{
    let state = state.clone();
    blocking(move || {
        let conn = open_db(state.db_path())?;
        work(&conn, &state)
    })
    .await
}

/// Runs `work` on the blocking pool without touching storage.
pub(crate) async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError::internal(format!("blocking task failed: {err}")))?
        .map_err(ApiError::from)
}
