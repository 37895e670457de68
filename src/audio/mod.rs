#[cfg(feature = "audio")]
mod rodio_output;

use thiserror::Error;

use crate::api::{ApiError, MixBackend};

#[cfg(feature = "audio")]
pub use rodio_output::RodioOutput;

/// Why an output refused to start a track. Never fatal: the controller turns
/// it into a manual-start prompt.
#[derive(Debug, Error)]
pub enum PlaybackRejected {
    #[error("no audio output device: {0}")]
    NoDevice(String),
    #[error("stream could not be fetched: {0}")]
    Stream(#[from] ApiError),
    #[error("stream could not be decoded: {0}")]
    Decode(String),
    #[error("audio playback is not available in this build")]
    Unsupported,
}

/// The audio element: one source at a time, replaced on every `start`.
pub trait AudioOutput {
    /// Replaces the current source with `bytes` and starts playing it.
    fn start(&mut self, bytes: Vec<u8>) -> Result<(), PlaybackRejected>;
    #[cfg(feature = "gui")]
    fn pause(&mut self);
    #[cfg(feature = "gui")]
    fn resume(&mut self);
    #[cfg(feature = "gui")]
    fn is_paused(&self) -> bool;
    fn stop(&mut self);
    /// True once a started source has played to its natural end.
    #[cfg(feature = "gui")]
    fn finished(&self) -> bool;
    /// Blocks until the current source ends. Returns at once if nothing is loaded.
    fn wait_until_end(&self);
}

/// Downloads a whole inline stream so it can be decoded.
pub fn fetch_stream(backend: &dyn MixBackend, url: &str) -> Result<Vec<u8>, PlaybackRejected> {
    let body = backend.open_stream(url)?;
    let bytes = body.into_bytes()?;
    log::debug!("fetched {} bytes from {}", bytes.len(), url);
    Ok(bytes)
}

/// Output used when no device can be opened or audio support is compiled out.
/// Every start is rejected.
#[derive(Debug, Default)]
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn start(&mut self, _bytes: Vec<u8>) -> Result<(), PlaybackRejected> {
        Err(PlaybackRejected::Unsupported)
    }

    #[cfg(feature = "gui")]
    fn pause(&mut self) {}

    #[cfg(feature = "gui")]
    fn resume(&mut self) {}

    #[cfg(feature = "gui")]
    fn is_paused(&self) -> bool {
        false
    }

    fn stop(&mut self) {}

    #[cfg(feature = "gui")]
    fn finished(&self) -> bool {
        false
    }

    fn wait_until_end(&self) {}
}

/// Opens the system's default output, falling back to `NullOutput`.
pub fn open_default_output() -> Box<dyn AudioOutput> {
    #[cfg(feature = "audio")]
    {
        match RodioOutput::new() {
            Ok(output) => return Box::new(output),
            Err(e) => log::warn!("audio output unavailable: {}", e),
        }
    }
    Box::new(NullOutput)
}
