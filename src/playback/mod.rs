//! Audio playback for place-narrator.
//!
//! # Design
//!
//! [`Player`] owns at most one [`PlaybackHandle`].  Loading always unloads the
//! previous handle first, and dropping the player unloads whatever is left,
//! so there is never more than one live clip on the output device.
//!
//! The device itself sits behind the [`AudioOutput`] trait:
//!
//! * [`RodioOutput`] — system default output via `rodio`.  The `OutputStream`
//!   lives on a dedicated OS thread; clips connect to its mixer.
//! * [`SilentOutput`] — accepts and "plays" clips without a device.

pub mod output;
pub mod player;

use thiserror::Error;

use crate::cache::StorageError;

pub use output::{RodioOutput, SilentOutput};
pub use player::{HandleId, PlaybackHandle, Player};

// ---------------------------------------------------------------------------
// Backend traits
// ---------------------------------------------------------------------------

/// An output device able to decode and host clips.
pub trait AudioOutput: Send + Sync {
    /// Decode `clip` and prepare it, paused, for playback.
    fn open(&self, clip: Vec<u8>) -> Result<Box<dyn LoadedClip>, PlaybackError>;
}

/// One decoded clip attached to an [`AudioOutput`].
pub trait LoadedClip: Send {
    /// Start (or resume) playback.
    fn play(&mut self) -> Result<(), PlaybackError>;

    /// `true` once every sample has been played (or the clip was stopped).
    fn is_finished(&self) -> bool;

    /// Stop and detach from the device.  Idempotent.
    fn stop(&mut self);
}

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The output device could not be opened or used.
    #[error("audio output unavailable: {0}")]
    Output(String),

    /// The clip is not in a format the backend can decode.
    #[error("cannot decode audio clip: {0}")]
    Decode(String),

    /// The referenced artifact could not be read.
    #[error("cannot load audio clip: {0}")]
    Load(#[from] StorageError),

    /// The handle was already unloaded or replaced.
    #[error("playback handle {0} is not loaded")]
    NotLoaded(HandleId),

    /// The blocking playback task panicked or was aborted.
    #[error("playback task failed: {0}")]
    Task(String),
}
