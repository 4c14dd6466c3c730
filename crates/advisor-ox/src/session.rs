//! Streaming chat session.
//!
//! A [`ChatSession`] owns the transcript and the busy state of one conversation. Each
//! [`submit`](ChatSession::submit) sends the new message with a bounded slice of history,
//! then grows a single assistant reply in place while the backend's event stream
//! arrives. Both the transcript and the phase are published through `watch` channels so
//! a renderer can follow along without holding any lock.

use std::{future::Future, time::Duration};

use advisor_ox_common::{SseFrame, SseParser};
use futures_util::{StreamExt, stream};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    AdvisorError, ChatBackend, ChatChunk, ChatRequest, Message, SessionConfig, Transcript,
    backend::ReplyStream,
    phase::{BusyGuard, ChatPhase},
};

/// Why a submission was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Nothing but whitespace was submitted
    EmptyInput,
    /// Another submission is still in flight
    Busy,
}

/// How a call to [`ChatSession::submit`] ended
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The reply stream ended normally
    Completed {
        /// Number of text fragments appended to the reply
        fragments: usize,
    },
    /// The caller cancelled the turn; text received so far is kept
    Cancelled,
    /// Nothing was sent
    Rejected(Rejection),
    /// The turn failed and the failure notice was recorded
    Failed(AdvisorError),
}

impl SubmitOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SubmitOutcome::Completed { .. })
    }
}

/// How a reply stream stopped without error
enum StreamEnd {
    Finished { fragments: usize },
    Cancelled,
}

/// Result of one awaited step that may be cut short by cancellation
enum Step<T> {
    Ready(T),
    Cancelled,
}

/// The assistant entry opened for the current turn.
///
/// If the turn is abandoned while the entry is still empty, because it was cancelled or
/// its future dropped, the entry is given the cancel notice on drop.
struct PendingReply<'a> {
    transcript: &'a watch::Sender<Transcript>,
    cancel_notice: &'a str,
    open: bool,
}

impl<'a> PendingReply<'a> {
    fn new(transcript: &'a watch::Sender<Transcript>, cancel_notice: &'a str) -> Self {
        Self {
            transcript,
            cancel_notice,
            open: false,
        }
    }

    fn open(&mut self) {
        self.transcript
            .send_modify(|transcript| transcript.append(Message::assistant("")));
        self.open = true;
    }

    /// Stop tracking the entry; returns whether one was opened
    fn settle(&mut self) -> bool {
        std::mem::take(&mut self.open)
    }
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        if self.open {
            let notice = self.cancel_notice;
            self.transcript
                .send_if_modified(|transcript| transcript.fill_empty_reply(notice));
        }
    }
}

pub struct ChatSession<B> {
    backend: B,
    config: SessionConfig,
    transcript: watch::Sender<Transcript>,
    phase: watch::Sender<ChatPhase>,
}

impl<B: ChatBackend> ChatSession<B> {
    pub fn new(backend: B, config: SessionConfig) -> Self {
        let transcript = match &config.welcome_message {
            Some(greeting) => Transcript::with_greeting(greeting.as_str()),
            None => Transcript::new(),
        };

        Self {
            backend,
            config,
            transcript: watch::Sender::new(transcript),
            phase: watch::Sender::new(ChatPhase::Idle),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Receive every transcript change; intermediate states may be coalesced
    pub fn subscribe(&self) -> watch::Receiver<Transcript> {
        self.transcript.subscribe()
    }

    /// Receive every phase change
    pub fn watch_phase(&self) -> watch::Receiver<ChatPhase> {
        self.phase.subscribe()
    }

    /// Snapshot of the current transcript
    pub fn transcript(&self) -> Transcript {
        self.transcript.borrow().clone()
    }

    pub fn phase(&self) -> ChatPhase {
        *self.phase.borrow()
    }

    pub fn is_busy(&self) -> bool {
        self.phase().is_busy()
    }

    /// Send `text` and stream the reply into the transcript.
    ///
    /// Ignored when `text` is blank or another submission is in flight. Failures never
    /// escape: they are logged, recorded in the transcript as the configured notice and
    /// returned as [`SubmitOutcome::Failed`].
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        self.submit_with_cancel(text, &CancellationToken::new()).await
    }

    /// Like [`submit`](Self::submit), but stops reading the reply once `cancel` fires.
    pub async fn submit_with_cancel(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> SubmitOutcome {
        if text.trim().is_empty() {
            log::debug!("Ignoring blank chat submission");
            return SubmitOutcome::Rejected(Rejection::EmptyInput);
        }

        let Some(mut guard) = BusyGuard::acquire(&self.phase) else {
            log::debug!("Ignoring chat submission while a reply is in flight");
            return SubmitOutcome::Rejected(Rejection::Busy);
        };

        let history = self.transcript.borrow().recent(self.config.history_limit);
        self.transcript
            .send_modify(|transcript| transcript.append(Message::user(text)));

        let request = ChatRequest::new(text, history);
        let mut pending = PendingReply::new(&self.transcript, &self.config.cancel_notice);

        match self
            .stream_reply(&request, &mut guard, &mut pending, cancel)
            .await
        {
            Ok(StreamEnd::Finished { fragments }) => {
                log::debug!("Chat reply finished after {fragments} fragments");
                pending.settle();
                SubmitOutcome::Completed { fragments }
            }
            Ok(StreamEnd::Cancelled) => {
                log::info!("Chat reply cancelled");
                SubmitOutcome::Cancelled
            }
            Err(err) => {
                log::error!("Chat request failed: {err}");
                guard.fail();
                let reply_open = pending.settle();
                let notice = self.config.failure_notice.as_str();
                self.transcript
                    .send_modify(|transcript| transcript.close_with_notice(notice, reply_open));
                SubmitOutcome::Failed(err)
            }
        }
    }

    async fn stream_reply(
        &self,
        request: &ChatRequest,
        guard: &mut BusyGuard<'_>,
        pending: &mut PendingReply<'_>,
        cancel: &CancellationToken,
    ) -> Result<StreamEnd, AdvisorError> {
        let idle_timeout = self.config.idle_timeout;
        let accepted = bounded(idle_timeout, self.backend.open_reply(request));
        let reply = match step(cancel, accepted).await? {
            Step::Ready(reply) => reply,
            Step::Cancelled => return Ok(StreamEnd::Cancelled),
        };

        guard.streaming();
        pending.open();

        self.consume(with_idle_timeout(reply, idle_timeout), cancel).await
    }

    /// Apply every frame of the reply to the pending assistant message
    async fn consume(
        &self,
        reply: ReplyStream,
        cancel: &CancellationToken,
    ) -> Result<StreamEnd, AdvisorError> {
        let mut parser = SseParser::new(reply);
        let mut fragments = 0;

        loop {
            let frame = match step(cancel, parser.next_frame()).await? {
                Step::Ready(frame) => frame,
                Step::Cancelled => return Ok(StreamEnd::Cancelled),
            };

            let payload = match frame {
                None | Some(SseFrame::Done) => return Ok(StreamEnd::Finished { fragments }),
                Some(SseFrame::Data(payload)) => payload,
            };

            let chunk = match serde_json::from_str::<ChatChunk>(&payload) {
                Ok(chunk) => chunk,
                Err(e) => {
                    log::warn!("Skipping malformed chat event: {e}; payload: {payload}");
                    continue;
                }
            };

            if let Some(failure) = chunk.failure() {
                return Err(AdvisorError::Backend(failure));
            }

            if let Some(fragment) = chunk.fragment() {
                let mut appended = Ok(());
                self.transcript
                    .send_modify(|transcript| appended = transcript.append_to_last(fragment));
                appended?;
                fragments += 1;
            }

            if chunk.is_final() {
                return Ok(StreamEnd::Finished { fragments });
            }
        }
    }

}

/// Await `fut` unless `cancel` fires first
async fn step<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, AdvisorError>>,
) -> Result<Step<T>, AdvisorError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Ok(Step::Cancelled),
        result = fut => result.map(Step::Ready),
    }
}

/// Fail `fut` with [`AdvisorError::Stalled`] if it takes longer than `limit`
async fn bounded<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = Result<T, AdvisorError>>,
) -> Result<T, AdvisorError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or_else(|_| Err(AdvisorError::Stalled(limit))),
        None => fut.await,
    }
}

/// Bound the wait for every chunk off the wire.
///
/// Applied to raw bytes, not decoded events, so keep-alive comments and partial blocks
/// count as activity. The stream ends after yielding the stall error.
fn with_idle_timeout(reply: ReplyStream, limit: Option<Duration>) -> ReplyStream {
    let Some(limit) = limit else {
        return reply;
    };

    stream::unfold(Some(reply), move |reply| async move {
        let mut reply = reply?;
        match tokio::time::timeout(limit, reply.next()).await {
            Ok(Some(chunk)) => Some((chunk, Some(reply))),
            Ok(None) => None,
            Err(_) => Some((Err(AdvisorError::Stalled(limit)), None)),
        }
    })
    .boxed()
}

impl<B> std::fmt::Debug for ChatSession<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("config", &self.config)
            .field("phase", &*self.phase.borrow())
            .field("messages", &self.transcript.borrow().len())
            .finish_non_exhaustive()
    }
}
