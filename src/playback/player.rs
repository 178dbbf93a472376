//! [`Player`] — exclusive owner of the single loaded clip.

use std::fmt;
use std::sync::Arc;

use crate::cache::StorageRef;
use crate::playback::{AudioOutput, LoadedClip, PlaybackError};

/// Identifier of a handle issued by [`Player::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The live, loaded clip.  Only ever held inside a [`Player`].
pub struct PlaybackHandle {
    id: HandleId,
    reference: StorageRef,
    clip: Box<dyn LoadedClip>,
}

impl PlaybackHandle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn reference(&self) -> &StorageRef {
        &self.reference
    }
}

impl fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("id", &self.id)
            .field("reference", &self.reference)
            .finish_non_exhaustive()
    }
}

/// Loads and plays one clip at a time.
///
/// ```rust
/// use std::sync::Arc;
/// use place_narrator::playback::{Player, SilentOutput};
///
/// let player = Player::new(Arc::new(SilentOutput));
/// assert!(player.loaded().is_none());
/// ```
pub struct Player {
    output: Arc<dyn AudioOutput>,
    current: Option<PlaybackHandle>,
    next_id: u64,
}

impl Player {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self {
            output,
            current: None,
            next_id: 1,
        }
    }

    /// Load the clip behind `reference`, unloading any previous handle first.
    pub fn load(&mut self, reference: &StorageRef) -> Result<HandleId, PlaybackError> {
        self.unload_current();

        let bytes = reference.read()?;
        let clip = self.output.open(bytes)?;

        let id = HandleId(self.next_id);
        self.next_id += 1;

        log::debug!("player: loaded {reference} as {id}");
        self.current = Some(PlaybackHandle {
            id,
            reference: reference.clone(),
            clip,
        });
        Ok(id)
    }

    /// Start playing `id`.
    pub fn play(&mut self, id: HandleId) -> Result<(), PlaybackError> {
        match self.current.as_mut() {
            Some(handle) if handle.id == id => {
                log::debug!("player: playing {id}");
                handle.clip.play()
            }
            _ => Err(PlaybackError::NotLoaded(id)),
        }
    }

    /// Stop and release `id` if it is the loaded handle.  Returns whether
    /// anything was released.
    pub fn unload(&mut self, id: HandleId) -> bool {
        if self.loaded() == Some(id) {
            self.unload_current().is_some()
        } else {
            false
        }
    }

    /// Stop and release whatever is loaded.
    pub fn unload_current(&mut self) -> Option<HandleId> {
        let mut handle = self.current.take()?;
        handle.clip.stop();
        log::debug!("player: unloaded {}", handle.id);
        Some(handle.id)
    }

    /// `true` when `id` has played to the end, or is no longer loaded.
    pub fn is_finished(&self, id: HandleId) -> bool {
        match self.current.as_ref() {
            Some(handle) if handle.id == id => handle.clip.is_finished(),
            _ => true,
        }
    }

    /// The currently loaded handle, if any.
    pub fn loaded(&self) -> Option<HandleId> {
        self.current.as_ref().map(|h| h.id)
    }

    pub fn current(&self) -> Option<&PlaybackHandle> {
        self.current.as_ref()
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.unload_current();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
