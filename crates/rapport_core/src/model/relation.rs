//! Pairwise relations between persons.
//!
//! # Invariants
//! - Stored as two directed rows (A->B, B->A) sharing one `relation_type`.
//! - At most one relation fact per unordered pair.

use crate::model::person::PersonId;
use serde::{Deserialize, Serialize};

pub type RelationId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: RelationId,
    pub from_person_id: PersonId,
    pub to_person_id: PersonId,
    pub relation_type: String,
    pub confirmed_by_user: bool,
    pub created_at: i64,
}

impl Relation {
    /// Order-independent identity of the pair this row belongs to.
    pub fn pair_key(&self) -> (PersonId, PersonId) {
        pair_key(self.from_person_id, self.to_person_id)
    }
}

/// Relation addressed by the other person's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDraft {
    pub to_person_id: PersonId,
    pub relation_type: String,
}

/// Relation addressed by the other person's display name, as extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRelation {
    pub name: String,
    pub relation_type: String,
}

impl ExtractedRelation {
    pub fn new(name: impl Into<String>, relation_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relation_type: relation_type.into(),
        }
    }
}

pub fn pair_key(a: PersonId, b: PersonId) -> (PersonId, PersonId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
