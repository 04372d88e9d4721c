//! Input validation shared by repositories and services.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid hex color regex")
});

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is blank after trim.
    BlankField(&'static str),
    /// Text exceeds the accepted character count.
    TooLong { field: &'static str, max_chars: usize },
    /// Circle color is not `#RGB` or `#RRGGBB`.
    InvalidColor(String),
    /// A relation must connect two different people.
    SelfRelation,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::TooLong { field, max_chars } => {
                write!(f, "{field} must be at most {max_chars} characters")
            }
            Self::InvalidColor(value) => write!(f, "invalid color `{value}`; expected #RGB or #RRGGBB"),
            Self::SelfRelation => write!(f, "a person cannot be related to themselves"),
        }
    }
}

impl Error for ValidationError {}

/// Trims a required text field and rejects blank values.
pub fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(trimmed.to_string())
}

/// Rejects values longer than `max_chars` Unicode scalar values.
pub fn limit_chars(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max_chars {
        return Err(ValidationError::TooLong { field, max_chars });
    }
    Ok(())
}

/// Normalizes a circle color to trimmed form after format check.
pub fn normalize_color(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if !HEX_COLOR_RE.is_match(trimmed) {
        return Err(ValidationError::InvalidColor(value.to_string()));
    }
    Ok(trimmed.to_string())
}
