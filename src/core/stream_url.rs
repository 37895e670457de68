use reqwest::Url;

use crate::api::ApiError;

pub const SEARCH_PATH: &str = "/api/search";
pub const STREAM_PATH: &str = "/api/stream_download";

/// How the backend should serve a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// `Content-Disposition: attachment`. No `mode` parameter is sent.
    Download,
    /// `Content-Disposition: inline`, sent as `mode=play`.
    Play,
}

/// Builds absolute backend URLs from the configured base.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn search(&self) -> Result<Url, ApiError> {
        self.join(SEARCH_PATH)
    }

    /// `<base>/api/stream_download?url=..&title=..[&mode=play]`.
    pub fn stream(&self, source_url: &str, title: &str, mode: StreamMode) -> Result<Url, ApiError> {
        let mut url = self.join(STREAM_PATH)?;
        url.set_query(Some(&stream_query(source_url, title, mode)));
        Ok(url)
    }

    fn join(&self, path: &str) -> Result<Url, ApiError> {
        let invalid = |reason: String| ApiError::InvalidUrl {
            url: self.base.clone(),
            reason,
        };
        let base = Url::parse(self.base.trim()).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("expected an http(s) URL".to_string()));
        }
        base.join(path).map_err(|e| invalid(e.to_string()))
    }
}

/// Query string with both values percent-encoded.
pub fn stream_query(source_url: &str, title: &str, mode: StreamMode) -> String {
    let mut query = format!(
        "url={}&title={}",
        urlencoding::encode(source_url),
        urlencoding::encode(title)
    );
    if mode == StreamMode::Play {
        query.push_str("&mode=play");
    }
    query
}
