use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_DISPOSITION;

use crate::api::{ApiError, MixBackend, StreamBody};
use crate::core::stream_url::Endpoints;
use crate::models::{ErrorBody, SearchRequest, SearchResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Mix lookups page through the YouTube API server-side and can take a while.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(60);

/// `MixBackend` over HTTP.
pub struct HttpBackend {
    client: Client,
    endpoints: Endpoints,
}

impl HttpBackend {
    pub fn new(endpoints: Endpoints) -> Result<Self, ApiError> {
        // Streams run as long as the song; only searches get a total timeout.
        let client = Client::builder()
            .user_agent(concat!("mixdl/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None::<Duration>)
            .build()?;

        Ok(Self { client, endpoints })
    }

    /// Fetches a thumbnail image. These live on the video host, not the backend.
    #[cfg(feature = "gui")]
    pub fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let resp = check_status(self.client.get(url).timeout(SEARCH_TIMEOUT).send()?)?;
        Ok(resp.bytes()?.to_vec())
    }
}

impl MixBackend for HttpBackend {
    fn search(&self, request: &SearchRequest) -> Result<SearchResult, ApiError> {
        let url = self.endpoints.search()?;
        log::debug!("POST {} {:?}", url, request);

        let resp = self
            .client
            .post(url)
            .json(request)
            .timeout(SEARCH_TIMEOUT)
            .send()?;
        let resp = check_status(resp)?;

        resp.json::<SearchResult>()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn open_stream(&self, url: &str) -> Result<StreamBody, ApiError> {
        log::debug!("GET {}", url);
        let resp = check_status(self.client.get(url).send()?)?;

        let filename = resp
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_filename);

        Ok(StreamBody {
            filename,
            reader: Box::new(resp),
        })
    }
}

/// Turns a non-2xx response into `ApiError::Server`, reading the `error`
/// field of the body when it is JSON.
fn check_status(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body: ErrorBody = resp.json().unwrap_or_default();
    Err(ApiError::Server {
        status: status.as_u16(),
        message: body.error,
    })
}

/// Extracts the filename from a `Content-Disposition` value, preferring the
/// RFC 5987 `filename*=UTF-8''...` form over the plain `filename="..."` one.
pub fn disposition_filename(value: &str) -> Option<String> {
    let params: Vec<&str> = value.split(';').map(str::trim).collect();

    for param in &params {
        if let Some(encoded) = strip_prefix_ignore_case(param, "filename*=") {
            let encoded = strip_prefix_ignore_case(encoded, "UTF-8''").unwrap_or(encoded);
            if let Ok(decoded) = urlencoding::decode(encoded) {
                if !decoded.is_empty() {
                    return Some(decoded.into_owned());
                }
            }
        }
    }

    params.iter().find_map(|param| {
        let raw = strip_prefix_ignore_case(param, "filename=")?;
        let name = raw.trim_matches('"');
        (!name.is_empty()).then(|| name.to_string())
    })
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}
