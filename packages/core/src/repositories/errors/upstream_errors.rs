use thiserror::Error;

/// Failures talking to the user history or question catalog services.
/// The question selector recovers from all of them locally.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Upstream returned status {0}")]
    Status(u16),
    #[error("Failed to call upstream service: {0}")]
    Transport(String),
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            UpstreamError::Decode(error.to_string())
        } else {
            UpstreamError::Transport(error.to_string())
        }
    }
}
