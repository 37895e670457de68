use std::io::Cursor;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use super::{AudioOutput, PlaybackRejected};

/// Plays decoded MP3 data on the default output device.
pub struct RodioOutput {
    // Dropping the stream silences every sink.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Option<Sink>,
}

impl RodioOutput {
    pub fn new() -> Result<Self, PlaybackRejected> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| PlaybackRejected::NoDevice(e.to_string()))?;
        Ok(Self {
            _stream: stream,
            handle,
            sink: None,
        })
    }
}

impl AudioOutput for RodioOutput {
    fn start(&mut self, bytes: Vec<u8>) -> Result<(), PlaybackRejected> {
        let source =
            Decoder::new(Cursor::new(bytes)).map_err(|e| PlaybackRejected::Decode(e.to_string()))?;
        let sink =
            Sink::try_new(&self.handle).map_err(|e| PlaybackRejected::NoDevice(e.to_string()))?;

        if let Some(old) = self.sink.take() {
            old.stop();
        }
        sink.append(source);
        sink.play();
        self.sink = Some(sink);
        Ok(())
    }

    #[cfg(feature = "gui")]
    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    #[cfg(feature = "gui")]
    fn resume(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    #[cfg(feature = "gui")]
    fn is_paused(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| s.is_paused())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    #[cfg(feature = "gui")]
    fn finished(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| s.empty())
    }

    fn wait_until_end(&self) {
        if let Some(sink) = &self.sink {
            sink.sleep_until_end();
        }
    }
}
