pub mod client;
pub mod error;

use std::io::Read;

pub use error::ApiError;

use crate::models::{SearchRequest, SearchResult};

/// An open audio response from `/api/stream_download`.
pub struct StreamBody {
    /// Filename announced by the server's `Content-Disposition`, if any.
    pub filename: Option<String>,
    pub reader: Box<dyn Read + Send>,
}

impl StreamBody {
    /// Reads the whole body into memory.
    pub fn into_bytes(mut self) -> Result<Vec<u8>, ApiError> {
        let mut buf = Vec::new();
        self.reader
            .read_to_end(&mut buf)
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(buf)
    }
}

/// The two backend endpoints the client talks to.
/// `HttpBackend` is the real implementation; tests substitute their own.
pub trait MixBackend {
    /// `POST /api/search`.
    fn search(&self, request: &SearchRequest) -> Result<SearchResult, ApiError>;
    /// `GET` an absolute streaming URL built by `core::stream_url`.
    fn open_stream(&self, url: &str) -> Result<StreamBody, ApiError>;
}
