use std::time::Duration;

use advisor_ox_common::CommonRequestError;
use thiserror::Error;

use crate::transcript::TranscriptError;

/// Errors that can occur when chatting with the advisory backend
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// HTTP client errors, including connection resets in the middle of a stream
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    /// The backend rejected the request with a non-success status
    #[error("Advisory backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The backend reported a failure inside the event stream
    #[error("Advisory backend reported an error: {0}")]
    Backend(String),

    /// Nothing arrived from the backend within the configured idle timeout
    #[error("No data from the advisory backend for {0:?}")]
    Stalled(Duration),

    /// Transport failure from a non-HTTP backend
    #[error("Stream interrupted: {0}")]
    Interrupted(String),

    /// The request could not be built
    #[error("Request builder error: {0}")]
    RequestBuilder(String),

    /// Illegal transcript mutation
    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    /// A configuration value could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<CommonRequestError> for AdvisorError {
    fn from(err: CommonRequestError) -> Self {
        match err {
            CommonRequestError::Http(e) => AdvisorError::ReqwestError(e),
            CommonRequestError::Json(e) => AdvisorError::SerdeError(e),
            CommonRequestError::Status { status, message } => {
                AdvisorError::Status { status, message }
            }
            CommonRequestError::RequestBuilder(msg) => AdvisorError::RequestBuilder(msg),
        }
    }
}
