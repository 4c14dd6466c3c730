#![allow(dead_code)]

use std::sync::Mutex;

use advisor_ox::{AdvisorError, ChatBackend, ChatRequest, ReplyStream};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use tokio::sync::mpsc;

/// What the backend does with the next request
pub enum Script {
    /// Accept and stream these chunks, then end
    Reply(Vec<Result<Bytes, AdvisorError>>),
    /// Accept and forward chunks sent on the channel until its sender is dropped
    Channel(mpsc::UnboundedReceiver<Bytes>),
    /// Accept and never send anything
    Silent,
    /// Refuse the request
    Reject(AdvisorError),
}

/// In-process backend that replays scripted replies and records requests
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<Vec<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(chunks: &[&str]) -> Self {
        Self::new(vec![reply(chunks)])
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn reply(chunks: &[&str]) -> Script {
    Script::Reply(
        chunks
            .iter()
            .map(|c| Ok(Bytes::copy_from_slice(c.as_bytes())))
            .collect(),
    )
}

pub fn reply_bytes(chunks: Vec<Vec<u8>>) -> Script {
    Script::Reply(chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect())
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn open_reply(&self, request: &ChatRequest) -> Result<ReplyStream, AdvisorError> {
        self.requests.lock().unwrap().push(request.clone());

        let script = {
            let mut scripts = self.scripts.lock().unwrap();
            assert!(!scripts.is_empty(), "unexpected request: {request:?}");
            scripts.remove(0)
        };

        match script {
            Script::Reply(chunks) => Ok(stream::iter(chunks).boxed()),
            Script::Channel(rx) => Ok(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|chunk| (Ok(chunk), rx))
            })
            .boxed()),
            Script::Silent => Ok(stream::pending().boxed()),
            Script::Reject(err) => Err(err),
        }
    }
}

/// SSE block carrying one text fragment
pub fn chunk_event(text: &str) -> String {
    format!("data: {}\n\n", serde_json::json!({ "chunk": text }))
}
