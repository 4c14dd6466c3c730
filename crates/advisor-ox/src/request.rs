use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct ChatRequest {
    #[builder(into)]
    pub message: String,
    #[builder(default)]
    pub history: Vec<Message>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, history: Vec<Message>) -> Self {
        Self {
            message: message.into(),
            history,
        }
    }
}
