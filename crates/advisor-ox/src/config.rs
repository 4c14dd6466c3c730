use std::time::Duration;

use bon::Builder;

use crate::AdvisorError;

/// How many prior transcript entries accompany each message
pub const DEFAULT_HISTORY_LIMIT: usize = 6;

pub const DEFAULT_FAILURE_NOTICE: &str = "Sorry, I encountered an error. Please try again later.";

pub const DEFAULT_CANCEL_NOTICE: &str = "Stopped before any reply arrived.";

pub const DEFAULT_WELCOME_MESSAGE: &str = "Hello! I'm your advanced farming assistant. I can help you \
     with crop management, pest control, soil health, and more. What would you like to know?";

/// Behaviour of a [`ChatSession`](crate::ChatSession)
#[derive(Debug, Clone, Builder)]
pub struct SessionConfig {
    /// Number of prior entries sent as history with each message
    #[builder(default = DEFAULT_HISTORY_LIMIT)]
    pub history_limit: usize,

    /// Longest wait for the backend to accept a request or send the next chunk.
    /// `None` waits forever.
    pub idle_timeout: Option<Duration>,

    /// Assistant message recorded when a turn fails
    #[builder(default = DEFAULT_FAILURE_NOTICE.to_string(), into)]
    pub failure_notice: String,

    /// Content given to a reply that was cancelled before any text arrived
    #[builder(default = DEFAULT_CANCEL_NOTICE.to_string(), into)]
    pub cancel_notice: String,

    /// Assistant greeting the transcript starts with
    #[builder(into)]
    pub welcome_message: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SessionConfig {
    /// Read overrides from `ADVISOR_HISTORY_LIMIT` and `ADVISOR_IDLE_TIMEOUT_SECS`.
    ///
    /// An idle timeout of `0` disables it.
    pub fn from_env() -> Result<Self, AdvisorError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AdvisorError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("ADVISOR_HISTORY_LIMIT") {
            config.history_limit = parse_var("ADVISOR_HISTORY_LIMIT", &raw)?;
        }

        if let Some(raw) = lookup("ADVISOR_IDLE_TIMEOUT_SECS") {
            let secs: u64 = parse_var("ADVISOR_IDLE_TIMEOUT_SECS", &raw)?;
            config.idle_timeout = timeout_from_secs(secs);
        }

        Ok(config)
    }
}

/// `0` means no timeout
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AdvisorError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AdvisorError::InvalidConfig(format!("{key}={raw:?}: {e}")))
}
