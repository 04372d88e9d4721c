//! Merge logic that folds extracted candidates into stored people.
//!
//! # Responsibility
//! - Score description similarity over a fixed vocabulary.
//! - Detect duplicate events and decide which description to keep.
//! - Produce a `ReconcileResult` that the confirm flow applies atomically.

pub mod matcher;
pub mod reconciler;
pub mod resolver;
pub mod similarity;

pub use matcher::{EventMatcher, DEFAULT_MATCH_THRESHOLD};
pub use reconciler::{
    Conflict, EventReplacement, ProfileUpdates, ReconcileResult, Reconciler, RejectedEvent,
};
pub use resolver::{Choice, DetailChoice, DetailPreference, DetailResolver, LengthPreference};
pub use similarity::{similarity, KeywordCategory, Vocabulary};
