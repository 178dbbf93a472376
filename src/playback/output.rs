//! Concrete [`AudioOutput`] backends.

use std::io::Cursor;
use std::sync::mpsc;

use crate::playback::{AudioOutput, LoadedClip, PlaybackError};

// ---------------------------------------------------------------------------
// RodioOutput
// ---------------------------------------------------------------------------

/// System default output device via `rodio`.
///
/// `rodio::OutputStream` is not `Send` on every platform, so it is opened on
/// a dedicated `audio-output` thread and kept there.  Only its mixer (which
/// is `Send + Sync`) crosses back.  Dropping the `RodioOutput` closes the
/// keep-alive channel, which lets the thread drop the stream and exit.
pub struct RodioOutput {
    mixer: rodio::mixer::Mixer,
    _keepalive: mpsc::Sender<()>,
}

impl RodioOutput {
    /// Open the default output device.
    pub fn open_default() -> Result<Self, PlaybackError> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<rodio::mixer::Mixer, String>>();
        let (keep_tx, keep_rx) = mpsc::channel::<()>();

        std::thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || match rodio::OutputStreamBuilder::open_default_stream() {
                Ok(mut stream) => {
                    // Teardown is reported through `log`, not stderr.
                    stream.log_on_drop(false);
                    let _ = ready_tx.send(Ok(stream.mixer().clone()));
                    // Blocks until every sender is gone.
                    let _ = keep_rx.recv();
                    drop(stream);
                    log::debug!("audio-output: stream closed");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                }
            })
            .map_err(|e| PlaybackError::Output(format!("cannot spawn output thread: {e}")))?;

        let mixer = ready_rx
            .recv()
            .map_err(|_| PlaybackError::Output("output thread exited early".into()))?
            .map_err(PlaybackError::Output)?;

        log::info!("audio-output: default device opened");
        Ok(Self {
            mixer,
            _keepalive: keep_tx,
        })
    }
}

impl AudioOutput for RodioOutput {
    fn open(&self, clip: Vec<u8>) -> Result<Box<dyn LoadedClip>, PlaybackError> {
        let source = rodio::Decoder::new(Cursor::new(clip))
            .map_err(|e| PlaybackError::Decode(e.to_string()))?;

        let sink = rodio::Sink::connect_new(&self.mixer);
        sink.pause();
        sink.append(source);

        Ok(Box::new(RodioClip { sink }))
    }
}

struct RodioClip {
    sink: rodio::Sink,
}

impl LoadedClip for RodioClip {
    fn play(&mut self) -> Result<(), PlaybackError> {
        self.sink.play();
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }

    fn stop(&mut self) {
        self.sink.stop();
    }
}

// ---------------------------------------------------------------------------
// SilentOutput
// ---------------------------------------------------------------------------

/// Output that never touches a device.  A clip counts as finished as soon as
/// it is played.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentOutput;

impl AudioOutput for SilentOutput {
    fn open(&self, clip: Vec<u8>) -> Result<Box<dyn LoadedClip>, PlaybackError> {
        log::debug!("silent-output: accepted {} bytes", clip.len());
        Ok(Box::new(SilentClip { done: false }))
    }
}

struct SilentClip {
    done: bool,
}

impl LoadedClip for SilentClip {
    fn play(&mut self) -> Result<(), PlaybackError> {
        self.done = true;
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.done
    }

    fn stop(&mut self) {
        self.done = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_clip_finishes_after_play() {
        let mut clip = SilentOutput.open(vec![1, 2, 3]).unwrap();
        assert!(!clip.is_finished());
        clip.play().unwrap();
        assert!(clip.is_finished());
    }

    #[test]
    fn silent_stop_is_idempotent() {
        let mut clip = SilentOutput.open(Vec::new()).unwrap();
        clip.stop();
        clip.stop();
        assert!(clip.is_finished());
    }

    #[test]
    fn default_device_opens_and_closes_quietly() {
        // Headless machines have no device; nothing to check there.
        let Ok(output) = RodioOutput::open_default() else {
            return;
        };
        drop(output);
    }

    #[test]
    fn rodio_output_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RodioOutput>();
    }
}
