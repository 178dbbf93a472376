//! Pipeline state machine and shared application state.
//!
//! [`PipelineState`] drives the orchestrator's state machine.  Front ends read
//! it via [`SharedState`] or receive it through a
//! [`StatusObserver`](super::StatusObserver).
//!
//! [`AppState`] is the single source of truth: current phase and message,
//! the last place and anecdote, the cached artifact, and any error.
//!
//! [`SharedState`] is a type alias for `Arc<Mutex<AppState>>` — cheap to clone
//! and safe to share across threads.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::cache::StorageRef;

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// States of the narration pipeline.
///
/// ```text
/// Idle / Ready / Failed ──trigger──▶ AcquiringLocation
///   ──position──▶ ResolvingPlace
///   ──place─────▶ GeneratingNarrative
///   ──anecdote──▶ SynthesizingAudio
///   ──cached────▶ Ready
///   ──loaded────▶ Playing
///   ──finished──▶ Ready
/// any state ──error──▶ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    AcquiringLocation,
    ResolvingPlace,
    GeneratingNarrative,
    SynthesizingAudio,
    /// A clip is cached; a new trigger is accepted.
    Ready,
    Playing,
    /// The last run stopped at a stage error; a new trigger is accepted.
    Failed,
}

impl PipelineState {
    /// Returns `true` while a run owns the pipeline.
    ///
    /// ```
    /// use place_narrator::pipeline::PipelineState;
    ///
    /// assert!(!PipelineState::Idle.is_busy());
    /// assert!(PipelineState::ResolvingPlace.is_busy());
    /// assert!(PipelineState::Playing.is_busy());
    /// assert!(!PipelineState::Ready.is_busy());
    /// assert!(!PipelineState::Failed.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        !self.accepts_trigger()
    }

    /// Whether `run()` may start from this state.
    pub fn accepts_trigger(&self) -> bool {
        matches!(
            self,
            PipelineState::Idle | PipelineState::Ready | PipelineState::Failed
        )
    }

    /// Whether the machine may move from `self` to `next`.
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (*self, next) {
            (_, Failed) => true,
            (Idle | Ready | Failed, AcquiringLocation) => true,
            (AcquiringLocation, ResolvingPlace)
            | (ResolvingPlace, GeneratingNarrative)
            | (GeneratingNarrative, SynthesizingAudio)
            | (SynthesizingAudio, Ready)
            | (Ready, Playing)
            | (Playing, Ready) => true,
            _ => false,
        }
    }

    /// A short human-readable label suitable for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::AcquiringLocation => "Locating",
            PipelineState::ResolvingPlace => "Resolving",
            PipelineState::GeneratingNarrative => "Writing",
            PipelineState::SynthesizingAudio => "Synthesizing",
            PipelineState::Ready => "Ready",
            PipelineState::Playing => "Playing",
            PipelineState::Failed => "Error",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// PipelineStatus
// ---------------------------------------------------------------------------

/// A state paired with the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineStatus {
    pub state: PipelineState,
    pub message: String,
}

impl PipelineStatus {
    pub fn new(state: PipelineState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared application state.
///
/// Held behind [`SharedState`].  Only the orchestrator mutates it.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Current phase and its message.
    pub status: PipelineStatus,

    /// Place text of the most recent run that got that far.
    pub place: Option<String>,

    /// Anecdote of the most recent run that got that far.
    pub narrative: Option<String>,

    /// Where the last synthesized clip was cached.
    pub artifact: Option<StorageRef>,

    /// Error message when `status.state == Failed`.
    pub error_message: Option<String>,

    /// The phase that was active when the last failure happened.
    pub failed_at: Option<PipelineState>,

    /// Runs that played their clip to the end.
    pub completed_runs: u64,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`AppState`].
///
/// Lock for a short critical section only; never hold the lock across
/// `.await` points.
pub type SharedState = Arc<Mutex<AppState>>;

/// Construct a new [`SharedState`] wrapping a default [`AppState`].
pub fn new_shared_state() -> SharedState {
    Arc::new(Mutex::new(AppState::new()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
