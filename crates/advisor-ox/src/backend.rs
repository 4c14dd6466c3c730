use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::{AdvisorError, ChatRequest};

/// Reply body, chunk by chunk in network order
pub type ReplyStream = BoxStream<'static, Result<bytes::Bytes, AdvisorError>>;

/// Anything that can answer a chat request with an event stream.
///
/// `open_reply` resolves once the backend has accepted the request. A rejection (for
/// example a non-success HTTP status) must be reported here, before any chunk; errors
/// yielded by the returned stream are treated as failures in the middle of a reply.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn open_reply(&self, request: &ChatRequest) -> Result<ReplyStream, AdvisorError>;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for std::sync::Arc<T> {
    async fn open_reply(&self, request: &ChatRequest) -> Result<ReplyStream, AdvisorError> {
        (**self).open_reply(request).await
    }
}
