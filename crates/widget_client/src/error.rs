use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// A response arrived but its body was not the expected JSON.
    #[error("could not decode response: {0}")]
    Decode(String),

    /// HTTP 401 on an authenticated call.
    #[error("unauthorized")]
    Unauthorized(Option<String>),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::InvalidUrl(_))
    }
}

impl From<reqwest_middleware::Error> for ApiError {
    fn from(e: reqwest_middleware::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}
