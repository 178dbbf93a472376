//! Pipeline orchestrator module for place-narrator.
//!
//! This module wires the full position → place → anecdote → speech → cache →
//! playback pipeline and exposes the shared state front ends read.
//!
//! # Architecture
//!
//! ```text
//! trigger (stdin line / --once)
//!        │
//!        ▼
//! PipelineOrchestrator::run()  ← async tokio task, single-flight
//!        │
//!        ├─ PositionProvider::acquire        → AcquiringLocation
//!        ├─ LocationResolver::resolve        → ResolvingPlace
//!        ├─ NarrativeGenerator::generate     → GeneratingNarrative
//!        ├─ SpeechSynthesizer::synthesize    → SynthesizingAudio
//!        ├─ spawn_blocking(AudioStore::store)→ Ready
//!        └─ spawn_blocking(Player::load+play)→ Playing → Ready
//!
//! SharedState (Arc<Mutex<AppState>>) ←── read by front ends
//! StatusObserver                     ←── notified on every transition
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use place_narrator::cache::AudioCache;
//! use place_narrator::config::AppConfig;
//! use place_narrator::geocode::GeoNamesResolver;
//! use place_narrator::location::GatedPosition;
//! use place_narrator::narrative::ChatNarrator;
//! use place_narrator::pipeline::{LogObserver, PipelineOrchestrator, Stages};
//! use place_narrator::playback::{Player, SilentOutput};
//! use place_narrator::speech::OpenAiSpeech;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let stages = Stages {
//!         position: Arc::new(GatedPosition::from_config(&config.location)),
//!         resolver: Arc::new(GeoNamesResolver::from_config(&config.geocoder, "demo")),
//!         narrator: Arc::new(ChatNarrator::from_config(&config.narrative, None)),
//!         speech: Arc::new(OpenAiSpeech::from_config(&config.speech, None)),
//!         cache: Arc::new(AudioCache::from_config(&config.storage)),
//!     };
//!     let orchestrator = PipelineOrchestrator::new(stages, Player::new(Arc::new(SilentOutput)))
//!         .with_observer(Arc::new(LogObserver));
//!
//!     let outcome = orchestrator.run().await;
//!     println!("{outcome:?}");
//! }
//! ```

pub mod observer;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use observer::{LogObserver, StatusObserver};
pub use runner::{PipelineError, PipelineOrchestrator, RunOutcome, Stages};
pub use state::{new_shared_state, AppState, PipelineState, PipelineStatus, SharedState};
