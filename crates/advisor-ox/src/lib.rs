#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::missing_docs_in_private_items
)]

//! Streaming chat client for the farm advisory assistant.
//!
//! [`Advisor`] talks to the backend's `/api/chat` endpoint; [`ChatSession`] turns its
//! event stream into a growing [`Transcript`].

pub mod backend;
pub mod config;
pub mod error;
mod internal;
pub mod message;
pub mod phase;
pub mod request;
pub mod response;
pub mod session;
pub mod transcript;

pub use backend::{ChatBackend, ReplyStream};
pub use config::SessionConfig;
pub use error::AdvisorError;
pub use message::{Message, Role};
pub use phase::ChatPhase;
pub use request::ChatRequest;
pub use response::ChatChunk;
pub use session::{ChatSession, Rejection, SubmitOutcome};
pub use transcript::{Transcript, TranscriptError};

pub use tokio_util::sync::CancellationToken;

use async_trait::async_trait;
use bon::Builder;
use core::fmt;

use crate::internal::AdvisorRequestHelper;

const BASE_URL: &str = "http://localhost:5000";
const CHAT_PATH: &str = "api/chat";

/// HTTP client for the advisory backend
#[derive(Clone, Builder)]
pub struct Advisor {
    #[builder(default)]
    pub(crate) client: reqwest::Client,
    #[builder(default = BASE_URL.to_string(), into)]
    pub(crate) base_url: String,
    #[builder(default = CHAT_PATH.to_string(), into)]
    pub(crate) chat_path: String,
}

impl Default for Advisor {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Advisor {
    /// Create a client for the backend at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::builder().base_url(base_url).build()
    }

    /// Use `ADVISOR_BASE_URL` if set, the local development server otherwise.
    pub fn load_from_env() -> Self {
        match std::env::var("ADVISOR_BASE_URL") {
            Ok(base_url) if !base_url.trim().is_empty() => Self::new(base_url.trim()),
            _ => Self::default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create request helper for internal use
    fn request_helper(&self) -> AdvisorRequestHelper {
        AdvisorRequestHelper::new(self.client.clone(), &self.base_url, &self.chat_path)
    }
}

#[async_trait]
impl ChatBackend for Advisor {
    async fn open_reply(&self, request: &ChatRequest) -> Result<ReplyStream, AdvisorError> {
        self.request_helper().open_chat_stream(request).await
    }
}

impl fmt::Debug for Advisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Advisor")
            .field("base_url", &self.base_url)
            .field("chat_path", &self.chat_path)
            .finish_non_exhaustive()
    }
}
