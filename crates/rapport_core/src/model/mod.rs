//! Domain model for people and everything attached to them.
//!
//! # Responsibility
//! - Define the records persisted by the repository layer.
//! - Define draft/update shapes accepted from callers and extraction.
//!
//! # Invariants
//! - Every persisted record carries a stable integer id.
//! - Child records (events, annotations, developments) belong to exactly one
//!   person and disappear with it.

pub mod circle;
pub mod extraction;
pub mod graph;
pub mod person;
pub mod record;
pub mod relation;
pub mod validation;

use serde::{Deserialize, Deserializer, Serialize};

/// Provenance of a stored record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Entered or confirmed by the user.
    #[default]
    User,
    /// Produced by free-text extraction.
    Extracted,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Extracted => "extracted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "extracted" => Some(Self::Extracted),
            _ => None,
        }
    }
}

/// Treats an explicit JSON `null` like a missing field.
///
/// Extraction output routinely sends `"notes": null` for empty lists.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Returns the trimmed value, or `None` when it is blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{non_blank, Source};

    #[test]
    fn source_round_trips_through_db_strings() {
        for source in [Source::User, Source::Extracted] {
            assert_eq!(Source::parse(source.as_str()), Some(source));
        }
        assert_eq!(Source::parse("ai"), None);
    }

    #[test]
    fn non_blank_trims_and_drops_empty_values() {
        assert_eq!(non_blank(Some("  teacher ")), Some("teacher"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
