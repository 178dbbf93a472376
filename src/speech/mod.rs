//! Text-to-speech: [`NarrativeText`](crate::narrative::NarrativeText) → encoded
//! audio bytes.

pub mod synthesizer;

use thiserror::Error;

pub use synthesizer::{OpenAiSpeech, SpeechSynthesizer};

/// Errors from the speech-synthesis service.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("speech request failed: {0}")]
    Request(String),

    #[error("speech request timed out")]
    Timeout,

    #[error("speech service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// 2xx with a zero-length body.
    #[error("speech service returned no audio")]
    EmptyAudio,
}

impl From<reqwest::Error> for SynthesisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SynthesisError::Timeout
        } else {
            SynthesisError::Request(e.to_string())
        }
    }
}
