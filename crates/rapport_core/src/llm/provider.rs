//! Completion provider seam.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// One text-generation backend.
pub trait CompletionProvider: Send + Sync {
    /// Stable provider identifier (lowercase ASCII, digits, `_`, `-`).
    fn provider_id(&self) -> &str;

    /// Sends one system + user exchange and returns the raw answer text.
    fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError>;
}

/// Failure of a single provider attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// The endpoint answered with a non-200 status.
    HttpStatus(u16),
    /// Connection, TLS, DNS or timeout failure.
    Transport { kind: &'static str, message: String },
    /// The body was not the expected chat-completions shape.
    InvalidResponse(String),
    /// No content or reasoning text in the answer.
    EmptyContent,
}

impl CompletionError {
    /// Short machine-readable kind for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HttpStatus(_) => "http_non_200",
            Self::Transport { kind, .. } => kind,
            Self::InvalidResponse(_) => "invalid_response",
            Self::EmptyContent => "empty_content",
        }
    }
}

impl Display for CompletionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HttpStatus(status) => write!(f, "completion endpoint returned http {status}"),
            Self::Transport { kind, message } => write!(f, "{kind} error: {message}"),
            Self::InvalidResponse(message) => write!(f, "invalid completion response: {message}"),
            Self::EmptyContent => write!(f, "completion response has no content"),
        }
    }
}

impl Error for CompletionError {}
