//! Anecdote generation for place-narrator.
//!
//! * [`NarrativeGenerator`] — async trait implemented by all backends.
//! * [`ChatNarrator`] — OpenAI-compatible chat-completions backend.
//! * [`NarrativeText`] — non-empty anecdote text.
//! * [`NarrativeError`] — error variants for generation.

pub mod generator;
pub mod prompt;

use std::fmt;

use thiserror::Error;

pub use generator::{first_completion, ChatNarrator, NarrativeGenerator};
pub use prompt::TOUR_GUIDE_PERSONA;

// ---------------------------------------------------------------------------
// NarrativeText
// ---------------------------------------------------------------------------

/// Anecdote text.  Never empty: blank completions cannot be represented, so
/// nothing downstream can receive one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeText(String);

impl NarrativeText {
    /// Trimmed text, or `None` if nothing is left.
    ///
    /// ```
    /// use place_narrator::narrative::NarrativeText;
    ///
    /// assert!(NarrativeText::new("  ").is_none());
    /// assert_eq!(NarrativeText::new(" Hi ").unwrap().as_str(), "Hi");
    /// ```
    pub fn new(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NarrativeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// NarrativeError
// ---------------------------------------------------------------------------

/// Errors that can occur while generating an anecdote.
#[derive(Debug, Error)]
pub enum NarrativeError {
    /// HTTP transport or connection error.
    #[error("narrative request failed: {0}")]
    Request(String),

    #[error("narrative request timed out")]
    Timeout,

    /// Non-2xx HTTP status.
    #[error("narrative service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The body could not be parsed as JSON.
    #[error("failed to parse narrative response: {0}")]
    Parse(String),

    /// No completion, or a completion with no usable text.
    #[error("narrative service returned no anecdote")]
    EmptyResponse,
}

impl From<reqwest::Error> for NarrativeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            NarrativeError::Timeout
        } else {
            NarrativeError::Request(e.to_string())
        }
    }
}
