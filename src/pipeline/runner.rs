//! Pipeline orchestrator — drives position → place → anecdote → speech →
//! cache → playback.
//!
//! # Pipeline flow
//!
//! ```text
//! run()
//!   └─▶ single-flight check, state = AcquiringLocation        [Getting location...]
//!         └─▶ position.acquire()        → ResolvingPlace      [Getting nearest intersection...]
//!         └─▶ resolver.resolve()        → GeneratingNarrative [Getting factoids about location...]
//!         └─▶ narrator.generate()       → SynthesizingAudio   [Converting to audio...]
//!         └─▶ speech.synthesize()
//!         └─▶ spawn_blocking(cache.store)   → Ready
//!         └─▶ spawn_blocking(player.load + play) → Playing
//!         └─▶ poll until the clip ends  → Ready               [Click to hear more!]
//!   any stage error ──▶ Failed (stop; nothing later runs)
//! ```
//!
//! Blocking work (file writes, device calls) is pushed onto
//! `tokio::task::spawn_blocking` so the async runtime never stalls.  Network
//! stages race against the run's [`CancellationToken`]; blocking stages are
//! awaited to completion and check the token themselves.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::cache::{AudioStore, StorageError};
use crate::geocode::{GeocodeError, LocationResolver};
use crate::location::{LocationError, PositionProvider};
use crate::narrative::{NarrativeError, NarrativeGenerator};
use crate::playback::{HandleId, PlaybackError, Player};
use crate::speech::{SpeechSynthesizer, SynthesisError};

use super::observer::StatusObserver;
use super::state::{AppState, PipelineState, PipelineStatus, SharedState};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// The single error surface of a run.  Each stage maps onto exactly one
/// variant.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Permission to access location was denied")]
    PermissionDenied,

    #[error("Unable to fetch location: {0}")]
    LocationUnavailable(String),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Narrative(#[from] NarrativeError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    /// The run was aborted by [`PipelineOrchestrator::cancel`] or shutdown.
    #[error("Cancelled")]
    Cancelled,
}

impl From<LocationError> for PipelineError {
    fn from(e: LocationError) -> Self {
        match e {
            LocationError::PermissionDenied => PipelineError::PermissionDenied,
            LocationError::Unavailable(reason) => PipelineError::LocationUnavailable(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// RunOutcome
// ---------------------------------------------------------------------------

/// What a call to [`PipelineOrchestrator::run`] did.
#[derive(Debug)]
pub enum RunOutcome {
    /// Another run was in progress (in the given state); nothing happened.
    Rejected(PipelineState),
    /// The clip was generated and played to the end.
    Completed,
    /// The run stopped at `stage` with `error`.
    Failed {
        stage: PipelineState,
        error: PipelineError,
    },
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// The external collaborators, one per stage.
pub struct Stages {
    pub position: Arc<dyn PositionProvider>,
    pub resolver: Arc<dyn LocationResolver>,
    pub narrator: Arc<dyn NarrativeGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub cache: Arc<dyn AudioStore>,
}

// ---------------------------------------------------------------------------
// PipelineOrchestrator
// ---------------------------------------------------------------------------

const READY_SUFFIX: &str = "Click to hear more!";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Drives the complete narration pipeline.
///
/// Share it behind an `Arc` and call [`run`](Self::run) once per trigger;
/// overlapping calls are rejected, not queued.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use place_narrator::pipeline::{LogObserver, PipelineOrchestrator, Stages};
/// use place_narrator::playback::{Player, SilentOutput};
///
/// # async fn example(stages: Stages) {
/// let orchestrator = Arc::new(
///     PipelineOrchestrator::new(stages, Player::new(Arc::new(SilentOutput)))
///         .with_observer(Arc::new(LogObserver)),
/// );
/// let outcome = orchestrator.run().await;
/// println!("{outcome:?}");
/// # }
/// ```
pub struct PipelineOrchestrator {
    state: SharedState,
    stages: Stages,
    player: Arc<Mutex<Player>>,
    observers: Vec<Arc<dyn StatusObserver>>,
    /// Parent of every run's token; cancelled once on shutdown.
    shutdown: CancellationToken,
    /// Token of the run in progress (or of the last run).
    current_run: Mutex<CancellationToken>,
    poll_interval: Duration,
}

impl PipelineOrchestrator {
    pub fn new(stages: Stages, player: Player) -> Self {
        Self {
            state: super::state::new_shared_state(),
            stages,
            player: Arc::new(Mutex::new(player)),
            observers: Vec::new(),
            shutdown: CancellationToken::new(),
            current_run: Mutex::new(CancellationToken::new()),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Register an observer for every status change.
    pub fn with_observer(mut self, observer: Arc<dyn StatusObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// How often to check whether the playing clip has ended.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Handle to the shared state, for front ends that poll.
    pub fn shared_state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    pub fn state(&self) -> PipelineState {
        self.lock_state().status.state
    }

    pub fn status(&self) -> PipelineStatus {
        self.lock_state().status.clone()
    }

    pub fn snapshot(&self) -> AppState {
        self.lock_state().clone()
    }

    // -----------------------------------------------------------------------
    // Run
    // -----------------------------------------------------------------------

    /// Execute one full run.
    ///
    /// Returns [`RunOutcome::Rejected`] without side effects when a run is
    /// already in progress or the orchestrator has been shut down.
    pub async fn run(&self) -> RunOutcome {
        let token = match self.try_begin() {
            Ok(token) => token,
            Err(busy) => {
                log::warn!("pipeline: trigger ignored, run in progress ({busy})");
                return RunOutcome::Rejected(busy);
            }
        };

        match self.drive(&token).await {
            Ok(()) => RunOutcome::Completed,
            Err(error) => {
                if matches!(error, PipelineError::Cancelled) {
                    self.lock_player().unload_current();
                }
                let stage = self.fail(&error);
                RunOutcome::Failed { stage, error }
            }
        }
    }

    /// Abort the run in progress, if any.  The run ends in `Failed`.
    pub fn cancel(&self) {
        self.current_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    /// Cancel any run, refuse further triggers and release the clip.
    pub fn shutdown(&self) {
        log::info!("pipeline: shutting down");
        self.shutdown.cancel();
        if let Some(id) = self.lock_player().unload_current() {
            log::debug!("pipeline: released {id} on shutdown");
        }
    }

    async fn drive(&self, token: &CancellationToken) -> Result<(), PipelineError> {
        // ── 1. Position ──────────────────────────────────────────────────
        let at = guarded(token, self.stages.position.acquire()).await?;
        log::info!("pipeline: position {at}");

        // ── 2. Place ─────────────────────────────────────────────────────
        self.advance(
            PipelineState::ResolvingPlace,
            "Getting nearest intersection...",
        );
        let place = guarded(token, self.stages.resolver.resolve(at)).await?;
        log::info!("pipeline: place = {place}");
        self.lock_state().place = Some(place.to_string());

        // ── 3. Anecdote ──────────────────────────────────────────────────
        self.advance(
            PipelineState::GeneratingNarrative,
            "Getting factoids about location...",
        );
        let text = guarded(token, self.stages.narrator.generate(&place)).await?;
        log::debug!("pipeline: anecdote = {text:?}");
        self.lock_state().narrative = Some(text.to_string());

        // ── 4. Speech + cache ────────────────────────────────────────────
        self.advance(
            PipelineState::SynthesizingAudio,
            format!("Converting to audio...\n\n{text}"),
        );
        let audio = guarded(token, self.stages.speech.synthesize(&text)).await?;

        let cache = Arc::clone(&self.stages.cache);
        let reference = blocking(
            token,
            move |token| {
                if token.is_cancelled() {
                    return Ok(None);
                }
                cache.store(&audio).map(Some)
            },
            StorageError::Task,
        )
        .await?;
        self.lock_state().artifact = Some(reference.clone());

        let ready_message = format!("{text}\n\n{READY_SUFFIX}");
        self.advance(PipelineState::Ready, ready_message.clone());

        // ── 5. Playback ──────────────────────────────────────────────────
        let player = Arc::clone(&self.player);
        let id = blocking(
            token,
            move |token| {
                let mut player = player.lock().unwrap_or_else(PoisonError::into_inner);
                // Checked under the player lock: cancel/shutdown unload under
                // the same lock, so a cancelled run never loads after them.
                if token.is_cancelled() {
                    return Ok(None);
                }
                let id = player.load(&reference)?;
                if let Err(e) = player.play(id) {
                    player.unload(id);
                    return Err(e);
                }
                Ok(Some(id))
            },
            PlaybackError::Task,
        )
        .await?;

        self.advance(PipelineState::Playing, text.to_string());
        self.wait_for_clip(id, token).await?;

        self.lock_state().completed_runs += 1;
        self.advance(PipelineState::Ready, ready_message);
        Ok(())
    }

    async fn wait_for_clip(
        &self,
        id: HandleId,
        token: &CancellationToken,
    ) -> Result<(), PipelineError> {
        loop {
            let finished = self.lock_player().is_finished(id);
            if finished {
                log::debug!("pipeline: clip {id} finished");
                return Ok(());
            }
            tokio::select! {
                _ = token.cancelled() => return Err(PipelineError::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    // -----------------------------------------------------------------------
    // State transitions
    // -----------------------------------------------------------------------

    /// Atomically claim the pipeline for a new run.
    fn try_begin(&self) -> Result<CancellationToken, PipelineState> {
        let token = self.shutdown.child_token();
        let status = {
            let mut st = self.lock_state();
            let current = st.status.state;
            if !current.accepts_trigger() || self.shutdown.is_cancelled() {
                return Err(current);
            }
            st.status = PipelineStatus::new(PipelineState::AcquiringLocation, "Getting location...");
            st.error_message = None;
            st.failed_at = None;
            // Swapped under the state lock so cancel() never hits a stale token.
            *self
                .current_run
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = token.clone();
            st.status.clone()
        };

        log::info!("pipeline: run started");
        self.notify(&status);
        Ok(token)
    }

    fn advance(&self, next: PipelineState, message: impl Into<String>) {
        let status = {
            let mut st = self.lock_state();
            let current = st.status.state;
            if !current.can_transition_to(next) {
                log::warn!("pipeline: unexpected transition {current:?} → {next:?}");
            }
            st.status = PipelineStatus::new(next, message);
            st.status.clone()
        };
        self.notify(&status);
    }

    /// Record `error` into `Failed`; returns the stage that failed.
    ///
    /// Load and play happen while the state still reads `Ready`, so playback
    /// errors are attributed to `Playing`.
    fn fail(&self, error: &PipelineError) -> PipelineState {
        let message = error.to_string();
        let (stage, status) = {
            let mut st = self.lock_state();
            let stage = match error {
                PipelineError::Playback(_) => PipelineState::Playing,
                _ => st.status.state,
            };
            st.status = PipelineStatus::new(PipelineState::Failed, message.clone());
            st.error_message = Some(message.clone());
            st.failed_at = Some(stage);
            (stage, st.status.clone())
        };
        log::error!("pipeline error during {stage:?}: {message}");
        self.notify(&status);
        stage
    }

    fn notify(&self, status: &PipelineStatus) {
        for observer in &self.observers {
            observer.on_status(status);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_player(&self) -> MutexGuard<'_, Player> {
        self.player.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Await `stage` unless `token` fires first.
async fn guarded<T, E>(
    token: &CancellationToken,
    stage: impl Future<Output = Result<T, E>>,
) -> Result<T, PipelineError>
where
    PipelineError: From<E>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(PipelineError::Cancelled),
        result = stage => result.map_err(PipelineError::from),
    }
}

/// Run blocking `work` on the blocking pool and wait for it to finish.
///
/// The task is never detached: a cancelled run still waits for it, so no
/// file write or device call outlives the run that started it.  `work` gets
/// the token to re-check once it holds its own locks and returns `Ok(None)`
/// when it bailed out.
async fn blocking<T, E, F>(
    token: &CancellationToken,
    work: F,
    join_failed: fn(String) -> E,
) -> Result<T, PipelineError>
where
    F: FnOnce(&CancellationToken) -> Result<Option<T>, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    PipelineError: From<E>,
{
    if token.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    let task_token = token.clone();
    let done = match tokio::task::spawn_blocking(move || work(&task_token)).await {
        Ok(result) => result?,
        Err(e) => return Err(join_failed(e.to_string()).into()),
    };

    match done {
        Some(value) if !token.is_cancelled() => Ok(value),
        _ => Err(PipelineError::Cancelled),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    use super::*;
    use crate::cache::{AudioCache, StorageRef};
    use crate::config::LocationPermission;
    use crate::geocode::{Intersection, PlaceDescription};
    use crate::location::{
        Coordinates, FixedPosition, GatedPosition, StoredPermission,
    };
    use crate::narrative::NarrativeText;
    use crate::playback::player::tests::{DeviceEvent, RecordingOutput};

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    #[derive(Default)]
    struct Calls {
        resolve: AtomicUsize,
        generate: AtomicUsize,
        synthesize: AtomicUsize,
        store: AtomicUsize,
    }

    impl Calls {
        fn get(counter: &AtomicUsize) -> usize {
            counter.load(Ordering::SeqCst)
        }
    }

    struct MockResolver {
        calls: Arc<Calls>,
        place: PlaceDescription,
    }

    #[async_trait]
    impl LocationResolver for MockResolver {
        async fn resolve(&self, _at: Coordinates) -> Result<PlaceDescription, GeocodeError> {
            self.calls.resolve.fetch_add(1, Ordering::SeqCst);
            Ok(self.place.clone())
        }
    }

    enum NarratorMode {
        Ok(&'static str),
        Fail,
        /// Wait for the notify, then succeed.
        WaitFor(Arc<Notify>),
    }

    struct MockNarrator {
        calls: Arc<Calls>,
        mode: NarratorMode,
    }

    #[async_trait]
    impl NarrativeGenerator for MockNarrator {
        async fn generate(
            &self,
            _place: &PlaceDescription,
        ) -> Result<NarrativeText, NarrativeError> {
            self.calls.generate.fetch_add(1, Ordering::SeqCst);
            match &self.mode {
                NarratorMode::Ok(text) => Ok(NarrativeText::new(text).unwrap()),
                NarratorMode::Fail => Err(NarrativeError::EmptyResponse),
                NarratorMode::WaitFor(gate) => {
                    gate.notified().await;
                    Ok(NarrativeText::new("Late but here.").unwrap())
                }
            }
        }
    }

    struct MockSpeech {
        calls: Arc<Calls>,
        clip: Vec<u8>,
        fail: bool,
    }

    #[async_trait]
    impl SpeechSynthesizer for MockSpeech {
        async fn synthesize(&self, _text: &NarrativeText) -> Result<Vec<u8>, SynthesisError> {
            self.calls.synthesize.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SynthesisError::EmptyAudio);
            }
            Ok(self.clip.clone())
        }
    }

    struct CountingStore {
        calls: Arc<Calls>,
        inner: AudioCache,
        fail: bool,
    }

    impl AudioStore for CountingStore {
        fn store(&self, bytes: &[u8]) -> Result<StorageRef, StorageError> {
            self.calls.store.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StorageError::Write(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.inner.store(bytes)
        }
    }

    /// Stages that should fail instead of succeeding.
    #[derive(Default)]
    struct Faults {
        speech: bool,
        store: bool,
        play: bool,
    }

    // -----------------------------------------------------------------------
    // Harness
    // -----------------------------------------------------------------------

    const CLIP: &[u8] = b"ID3\x04\x00fake-mp3-payload\xff\xfb";

    struct Harness {
        orchestrator: Arc<PipelineOrchestrator>,
        calls: Arc<Calls>,
        output: Arc<RecordingOutput>,
        seen: Arc<Mutex<Vec<PipelineStatus>>>,
        _dir: TempDir,
    }

    fn brooklyn() -> PlaceDescription {
        PlaceDescription::Intersection(Intersection {
            street1: "Northside Piers".into(),
            street2: "N 5th St".into(),
            city_name: "Brooklyn".into(),
            admin_name2: "Kings County".into(),
            admin_name1: "New York".into(),
            country_code: "US".into(),
        })
    }

    fn harness(permission: LocationPermission, mode: NarratorMode) -> Harness {
        harness_with(permission, mode, Faults::default())
    }

    fn harness_with(permission: LocationPermission, mode: NarratorMode, faults: Faults) -> Harness {
        let dir = tempfile::tempdir().expect("temp dir");
        let calls = Arc::new(Calls::default());
        let output = Arc::new(RecordingOutput {
            fail_play: faults.play,
            ..RecordingOutput::default()
        });
        let seen = Arc::new(Mutex::new(Vec::new()));

        let stages = Stages {
            position: Arc::new(GatedPosition::new(
                Arc::new(StoredPermission(permission)),
                Arc::new(FixedPosition {
                    latitude: 35.69538,
                    longitude: 139.705050,
                }),
                Duration::from_secs(1),
            )),
            resolver: Arc::new(MockResolver {
                calls: Arc::clone(&calls),
                place: brooklyn(),
            }),
            narrator: Arc::new(MockNarrator {
                calls: Arc::clone(&calls),
                mode,
            }),
            speech: Arc::new(MockSpeech {
                calls: Arc::clone(&calls),
                clip: CLIP.to_vec(),
                fail: faults.speech,
            }),
            cache: Arc::new(CountingStore {
                calls: Arc::clone(&calls),
                inner: AudioCache::new(dir.path(), "narration.mp3"),
                fail: faults.store,
            }),
        };

        let sink = Arc::clone(&seen);
        let observer = move |s: &PipelineStatus| sink.lock().unwrap().push(s.clone());

        let orchestrator = PipelineOrchestrator::new(
            stages,
            Player::new(Arc::new(Arc::clone(&output))),
        )
        .with_observer(Arc::new(observer))
        .with_poll_interval(Duration::from_millis(5));

        Harness {
            orchestrator: Arc::new(orchestrator),
            calls,
            output,
            seen,
            _dir: dir,
        }
    }

    fn observed_states(h: &Harness) -> Vec<PipelineState> {
        h.seen.lock().unwrap().iter().map(|s| s.state).collect()
    }

    async fn wait_for_state(orc: &PipelineOrchestrator, wanted: PipelineState) {
        for _ in 0..400 {
            if orc.state() == wanted {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("state never reached {wanted:?}, stuck at {:?}", orc.state());
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn happy_path_walks_every_state_in_order() {
        let h = harness(LocationPermission::Granted, NarratorMode::Ok("The pier was a sugar refinery."));

        let outcome = h.orchestrator.run().await;
        assert!(matches!(outcome, RunOutcome::Completed), "{outcome:?}");

        use PipelineState::*;
        assert_eq!(
            observed_states(&h),
            vec![
                AcquiringLocation,
                ResolvingPlace,
                GeneratingNarrative,
                SynthesizingAudio,
                Ready,
                Playing,
                Ready
            ]
        );

        let snap = h.orchestrator.snapshot();
        assert_eq!(snap.status.state, Ready);
        assert_eq!(
            snap.status.message,
            "The pier was a sugar refinery.\n\nClick to hear more!"
        );
        assert_eq!(
            snap.place.as_deref(),
            Some("The intersection of Northside Piers and N 5th St in Brooklyn, Kings County, New York, US")
        );
        assert_eq!(snap.completed_runs, 1);
        assert!(snap.error_message.is_none());
    }

    #[tokio::test]
    async fn status_messages_follow_each_stage() {
        let h = harness(LocationPermission::Granted, NarratorMode::Ok("Story."));
        h.orchestrator.run().await;

        let messages: Vec<String> =
            h.seen.lock().unwrap().iter().map(|s| s.message.clone()).collect();
        assert_eq!(messages[0], "Getting location...");
        assert_eq!(messages[1], "Getting nearest intersection...");
        assert_eq!(messages[2], "Getting factoids about location...");
        assert_eq!(messages[3], "Converting to audio...\n\nStory.");
        assert_eq!(messages[5], "Story.");
    }

    #[tokio::test]
    async fn permission_denied_halts_at_acquiring_location() {
        let h = harness(LocationPermission::Denied, NarratorMode::Ok("unused"));

        let outcome = h.orchestrator.run().await;
        match outcome {
            RunOutcome::Failed { stage, error } => {
                assert_eq!(stage, PipelineState::AcquiringLocation);
                assert!(matches!(error, PipelineError::PermissionDenied));
            }
            other => panic!("expected Failed, got {other:?}"),
        }

        assert_eq!(Calls::get(&h.calls.resolve), 0);
        assert_eq!(Calls::get(&h.calls.generate), 0);
        assert_eq!(Calls::get(&h.calls.synthesize), 0);

        let snap = h.orchestrator.snapshot();
        assert_eq!(snap.status.state, PipelineState::Failed);
        assert_eq!(snap.failed_at, Some(PipelineState::AcquiringLocation));
        assert_eq!(
            snap.error_message.as_deref(),
            Some("Permission to access location was denied")
        );
        assert!(h.output.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn narrative_failure_short_circuits_synthesis_and_storage() {
        let h = harness(LocationPermission::Granted, NarratorMode::Fail);

        let outcome = h.orchestrator.run().await;
        match outcome {
            RunOutcome::Failed { stage, error } => {
                assert_eq!(stage, PipelineState::GeneratingNarrative);
                assert!(matches!(error, PipelineError::Narrative(_)));
            }
            other => panic!("expected Failed, got {other:?}"),
        }

        assert_eq!(Calls::get(&h.calls.generate), 1);
        assert_eq!(Calls::get(&h.calls.synthesize), 0);
        assert_eq!(Calls::get(&h.calls.store), 0);
        assert_eq!(
            observed_states(&h).last(),
            Some(&PipelineState::Failed)
        );
        assert!(h.orchestrator.snapshot().artifact.is_none());
    }

    #[tokio::test]
    async fn run_while_busy_is_rejected_without_side_effects() {
        let gate = Arc::new(Notify::new());
        let h = harness(
            LocationPermission::Granted,
            NarratorMode::WaitFor(Arc::clone(&gate)),
        );

        let orc = Arc::clone(&h.orchestrator);
        let first = tokio::spawn(async move { orc.run().await });

        wait_for_state(&h.orchestrator, PipelineState::GeneratingNarrative).await;
        let seen_before = h.seen.lock().unwrap().len();

        let second = h.orchestrator.run().await;
        assert!(matches!(
            second,
            RunOutcome::Rejected(PipelineState::GeneratingNarrative)
        ));
        assert_eq!(h.seen.lock().unwrap().len(), seen_before);
        assert_eq!(h.orchestrator.state(), PipelineState::GeneratingNarrative);
        assert_eq!(Calls::get(&h.calls.resolve), 1);
        assert_eq!(Calls::get(&h.calls.generate), 1);

        gate.notify_one();
        let outcome = first.await.expect("join");
        assert!(matches!(outcome, RunOutcome::Completed), "{outcome:?}");
        assert_eq!(Calls::get(&h.calls.synthesize), 1);
    }

    #[tokio::test]
    async fn synthesized_bytes_reach_the_player_unchanged() {
        let h = harness(LocationPermission::Granted, NarratorMode::Ok("Story."));
        h.orchestrator.run().await;

        let events = h.output.events.lock().unwrap().clone();
        assert_eq!(events[0], DeviceEvent::Open(CLIP.to_vec()));
        assert_eq!(events[1], DeviceEvent::Play(CLIP.to_vec()));

        let artifact = h.orchestrator.snapshot().artifact.expect("artifact");
        assert_eq!(artifact.read().unwrap(), CLIP);
    }

    #[tokio::test]
    async fn second_run_replaces_the_loaded_clip() {
        let h = harness(LocationPermission::Granted, NarratorMode::Ok("Story."));

        assert!(matches!(h.orchestrator.run().await, RunOutcome::Completed));
        assert!(matches!(h.orchestrator.run().await, RunOutcome::Completed));

        let events = h.output.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                DeviceEvent::Open(CLIP.to_vec()),
                DeviceEvent::Play(CLIP.to_vec()),
                DeviceEvent::Stop(CLIP.to_vec()),
                DeviceEvent::Open(CLIP.to_vec()),
                DeviceEvent::Play(CLIP.to_vec()),
            ]
        );
        assert_eq!(*h.output.max_live.lock().unwrap(), 1);
        assert_eq!(h.orchestrator.snapshot().completed_runs, 2);
    }

    #[tokio::test]
    async fn failed_run_accepts_a_new_trigger() {
        let h = harness(LocationPermission::Denied, NarratorMode::Ok("unused"));

        h.orchestrator.run().await;
        let again = h.orchestrator.run().await;
        assert!(matches!(again, RunOutcome::Failed { .. }));
        assert_eq!(
            observed_states(&h)
                .iter()
                .filter(|s| **s == PipelineState::AcquiringLocation)
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn cancel_aborts_the_inflight_stage() {
        let gate = Arc::new(Notify::new());
        let h = harness(
            LocationPermission::Granted,
            NarratorMode::WaitFor(Arc::clone(&gate)),
        );

        let orc = Arc::clone(&h.orchestrator);
        let run = tokio::spawn(async move { orc.run().await });

        wait_for_state(&h.orchestrator, PipelineState::GeneratingNarrative).await;
        h.orchestrator.cancel();

        match run.await.expect("join") {
            RunOutcome::Failed { stage, error } => {
                assert_eq!(stage, PipelineState::GeneratingNarrative);
                assert!(matches!(error, PipelineError::Cancelled));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(Calls::get(&h.calls.synthesize), 0);
        assert_eq!(h.orchestrator.state(), PipelineState::Failed);
    }

    #[tokio::test]
    async fn shutdown_releases_the_clip_and_refuses_triggers() {
        let h = harness(LocationPermission::Granted, NarratorMode::Ok("Story."));
        h.orchestrator.run().await;

        h.orchestrator.shutdown();
        assert_eq!(
            h.output.events.lock().unwrap().last(),
            Some(&DeviceEvent::Stop(CLIP.to_vec()))
        );

        let outcome = h.orchestrator.run().await;
        assert!(matches!(outcome, RunOutcome::Rejected(PipelineState::Ready)));
    }

    #[tokio::test]
    async fn synthesis_failure_skips_storage_and_playback() {
        let h = harness_with(
            LocationPermission::Granted,
            NarratorMode::Ok("Story."),
            Faults {
                speech: true,
                ..Faults::default()
            },
        );

        match h.orchestrator.run().await {
            RunOutcome::Failed { stage, error } => {
                assert_eq!(stage, PipelineState::SynthesizingAudio);
                assert!(matches!(error, PipelineError::Synthesis(_)));
            }
            other => panic!("expected Failed, got {other:?}"),
        }

        assert_eq!(Calls::get(&h.calls.synthesize), 1);
        assert_eq!(Calls::get(&h.calls.store), 0);
        assert!(h.output.events.lock().unwrap().is_empty());

        let snap = h.orchestrator.snapshot();
        assert_eq!(
            snap.error_message.as_deref(),
            Some("speech service returned no audio")
        );
        assert_eq!(snap.failed_at, Some(PipelineState::SynthesizingAudio));
        assert!(snap.artifact.is_none());
    }

    #[tokio::test]
    async fn storage_failure_never_reaches_the_player() {
        let h = harness_with(
            LocationPermission::Granted,
            NarratorMode::Ok("Story."),
            Faults {
                store: true,
                ..Faults::default()
            },
        );

        match h.orchestrator.run().await {
            RunOutcome::Failed { stage, error } => {
                assert_eq!(stage, PipelineState::SynthesizingAudio);
                assert!(matches!(error, PipelineError::Storage(_)));
            }
            other => panic!("expected Failed, got {other:?}"),
        }

        assert_eq!(Calls::get(&h.calls.store), 1);
        assert!(h.output.events.lock().unwrap().is_empty());

        let snap = h.orchestrator.snapshot();
        assert_eq!(
            snap.error_message.as_deref(),
            Some("cannot write audio artifact: disk full")
        );
        assert!(snap.artifact.is_none());
        assert_eq!(snap.completed_runs, 0);
    }

    #[tokio::test]
    async fn play_failure_unloads_the_fresh_handle() {
        let h = harness_with(
            LocationPermission::Granted,
            NarratorMode::Ok("Story."),
            Faults {
                play: true,
                ..Faults::default()
            },
        );

        match h.orchestrator.run().await {
            RunOutcome::Failed { stage, error } => {
                assert_eq!(stage, PipelineState::Playing);
                assert!(matches!(error, PipelineError::Playback(_)));
            }
            other => panic!("expected Failed, got {other:?}"),
        }

        assert_eq!(
            *h.output.events.lock().unwrap(),
            vec![
                DeviceEvent::Open(CLIP.to_vec()),
                DeviceEvent::Stop(CLIP.to_vec()),
            ]
        );
        assert_eq!(*h.output.max_live.lock().unwrap(), 1);
        assert!(h.orchestrator.player.lock().unwrap().loaded().is_none());

        let snap = h.orchestrator.snapshot();
        assert_eq!(snap.failed_at, Some(PipelineState::Playing));
        assert_eq!(
            snap.error_message.as_deref(),
            Some("audio output unavailable: device unplugged")
        );
        assert!(snap.artifact.is_some());
        assert_eq!(snap.completed_runs, 0);
        assert!(!observed_states(&h).contains(&PipelineState::Playing));
    }

    #[tokio::test]
    async fn cancel_before_playback_takes_the_player_loads_nothing() {
        let gate = Arc::new(Notify::new());
        let h = harness(
            LocationPermission::Granted,
            NarratorMode::WaitFor(Arc::clone(&gate)),
        );

        let orc = Arc::clone(&h.orchestrator);
        let run = tokio::spawn(async move { orc.run().await });
        wait_for_state(&h.orchestrator, PipelineState::GeneratingNarrative).await;

        // Hold the player so the playback task queues behind this guard.
        let held = h.orchestrator.player.lock().unwrap();
        gate.notify_one();
        wait_for_state(&h.orchestrator, PipelineState::Ready).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        h.orchestrator.cancel();
        drop(held);

        match run.await.expect("join") {
            RunOutcome::Failed { error, .. } => {
                assert!(matches!(error, PipelineError::Cancelled));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(h.output.events.lock().unwrap().is_empty());
        assert!(h.orchestrator.player.lock().unwrap().loaded().is_none());
        assert_eq!(h.orchestrator.state(), PipelineState::Failed);
    }

    #[tokio::test]
    async fn shutdown_mid_run_leaves_nothing_loaded() {
        let gate = Arc::new(Notify::new());
        let h = harness(
            LocationPermission::Granted,
            NarratorMode::WaitFor(Arc::clone(&gate)),
        );

        let orc = Arc::clone(&h.orchestrator);
        let run = tokio::spawn(async move { orc.run().await });
        wait_for_state(&h.orchestrator, PipelineState::GeneratingNarrative).await;

        h.orchestrator.shutdown();
        gate.notify_one();

        assert!(matches!(
            run.await.expect("join"),
            RunOutcome::Failed {
                error: PipelineError::Cancelled,
                ..
            }
        ));
        assert_eq!(Calls::get(&h.calls.store), 0);
        assert!(h.output.events.lock().unwrap().is_empty());
    }

    #[test]
    fn location_errors_map_onto_the_taxonomy() {
        assert!(matches!(
            PipelineError::from(LocationError::PermissionDenied),
            PipelineError::PermissionDenied
        ));
        let e = PipelineError::from(LocationError::Unavailable("gps off".into()));
        assert_eq!(e.to_string(), "Unable to fetch location: gps off");
    }
}
