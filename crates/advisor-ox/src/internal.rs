use advisor_ox_common::{Endpoint, RequestBuilder, RequestConfig};
use futures_util::{StreamExt, TryStreamExt};

use crate::{AdvisorError, ChatRequest, backend::ReplyStream};

/// Advisor client helper methods using the common `RequestBuilder`
pub(crate) struct AdvisorRequestHelper {
    request_builder: RequestBuilder,
    chat_path: String,
}

impl AdvisorRequestHelper {
    pub(crate) fn new(client: reqwest::Client, base_url: &str, chat_path: &str) -> Self {
        let config = RequestConfig::new(base_url)
            .with_user_agent(concat!("advisor-ox/", env!("CARGO_PKG_VERSION")));

        Self {
            request_builder: RequestBuilder::new(client, config),
            chat_path: chat_path.to_string(),
        }
    }

    /// Open a streaming chat reply
    pub(crate) async fn open_chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<ReplyStream, AdvisorError> {
        let endpoint =
            Endpoint::new(self.chat_path.as_str()).with_header("accept", "text/event-stream");

        log::debug!(
            "Sending chat message ({} chars) with {} history entries",
            request.message.chars().count(),
            request.history.len()
        );

        let stream = self.request_builder.open_stream(&endpoint, request).await?;
        Ok(stream.map_err(AdvisorError::from).boxed())
    }
}
