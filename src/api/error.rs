use thiserror::Error;

/// Failures talking to the mix backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection refused, DNS failure, timeout, broken body stream.
    #[error("failed to reach the server: {0}")]
    Transport(String),
    /// Non-2xx status, with the `error` field of the body when present.
    #[error("server returned HTTP {status}: {}", message.as_deref().unwrap_or("no message"))]
    Server { status: u16, message: Option<String> },
    /// 2xx status but the body was not the expected JSON.
    #[error("unexpected response from the server: {0}")]
    Decode(String),
    #[error("invalid server URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ApiError {
    /// Text for the notification area.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            ApiError::Server { .. } => "Something went wrong".to_string(),
            ApiError::Transport(_) | ApiError::Decode(_) | ApiError::InvalidUrl { .. } => {
                "Failed to connect to server".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}
