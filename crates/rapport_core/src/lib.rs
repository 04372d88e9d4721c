//! Core domain logic for the Rapport relationship backend.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod llm;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod repo;
pub mod service;

pub use config::{AppConfig, LlmConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{
    default_log_level, init_logging, logging_status, LogEcho, LogSettings, LoggingError,
};
pub use model::extraction::{ExtractedProfile, ExtractionPayload};
pub use model::person::{Person, PersonDetail, PersonId, PersonUpdate, Profile};
pub use reconcile::{
    DetailPreference, DetailResolver, EventMatcher, LengthPreference, ReconcileResult, Reconciler,
    Vocabulary,
};
pub use repo::{RepoError, RepoResult};
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
