//! Ordered conversation history owned by a chat session.
//!
//! The transcript only ever grows: entries are appended at the end, and the one entry
//! that may change after it was added is the last assistant message, whose content can
//! only be extended. Renderers can therefore diff two snapshots by length and by the
//! length of the last entry.

use thiserror::Error;

use crate::message::{Message, Role};

/// Rejected transcript mutation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("transcript is empty, there is no message to extend")]
    Empty,
    #[error("last message is from {0}, only assistant messages can be extended")]
    NotAssistant(Role),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transcript with an assistant greeting
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::assistant(greeting)],
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Extend the content of the last message, which must be from the assistant
    pub fn append_to_last(&mut self, fragment: &str) -> Result<(), TranscriptError> {
        let last = self.messages.last_mut().ok_or(TranscriptError::Empty)?;
        if !last.is_assistant() {
            return Err(TranscriptError::NotAssistant(last.role));
        }
        last.content.push_str(fragment);
        Ok(())
    }

    /// Record a failure notice at the end of a turn.
    ///
    /// An assistant reply that was opened but never received text is filled with the
    /// notice instead of being left empty. Anything else gets the notice as a new entry.
    pub fn close_with_notice(&mut self, notice: &str, reply_open: bool) {
        if !(reply_open && self.fill_empty_reply(notice)) {
            self.messages.push(Message::assistant(notice));
        }
    }

    /// Give a still-empty trailing assistant reply some content.
    ///
    /// Returns `false` and leaves the transcript alone when the last entry is not an
    /// empty assistant message.
    pub fn fill_empty_reply(&mut self, text: &str) -> bool {
        match self.messages.last_mut() {
            Some(last) if last.is_assistant() && last.content.is_empty() => {
                last.content.push_str(text);
                true
            }
            _ => false,
        }
    }

    /// Copy of the trailing `n` entries, oldest first
    pub fn recent(&self, n: usize) -> Vec<Message> {
        let start = self.messages.len().saturating_sub(n);
        self.messages[start..].to_vec()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_to_last_grows_assistant_message() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("hello"));
        transcript.append(Message::assistant(""));

        transcript.append_to_last("Hi").unwrap();
        transcript.append_to_last(" there").unwrap();

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.last().unwrap().content, "Hi there");
    }

    #[test]
    fn test_append_to_last_rejects_user_and_empty() {
        let mut transcript = Transcript::new();
        assert_eq!(transcript.append_to_last("x"), Err(TranscriptError::Empty));

        transcript.append(Message::user("hello"));
        assert_eq!(
            transcript.append_to_last("x"),
            Err(TranscriptError::NotAssistant(Role::User))
        );
        assert_eq!(transcript.last().unwrap().content, "hello");
    }

    #[test]
    fn test_recent_returns_trailing_entries() {
        let mut transcript = Transcript::with_greeting("Namaste");
        for i in 0..8 {
            transcript.append(Message::user(format!("q{i}")));
        }

        let recent = transcript.recent(6);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0].content, "q2");
        assert_eq!(recent[5].content, "q7");

        assert_eq!(transcript.recent(50).len(), 9);
        assert!(transcript.recent(0).is_empty());
    }

    #[test]
    fn test_close_with_notice_fills_empty_reply() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("test"));
        transcript.append(Message::assistant(""));

        transcript.close_with_notice("Sorry", true);

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.last().unwrap(), &Message::assistant("Sorry"));
    }

    #[test]
    fn test_close_with_notice_keeps_partial_reply() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("test"));
        transcript.append(Message::assistant("Partial"));

        transcript.close_with_notice("Sorry", true);

        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.messages()[1].content, "Partial");
        assert_eq!(transcript.messages()[2], Message::assistant("Sorry"));
    }

    #[test]
    fn test_close_with_notice_without_open_reply_appends() {
        // An empty greeting is not a reply of this turn
        let mut transcript = Transcript::with_greeting("");
        transcript.close_with_notice("Sorry", false);
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_fill_empty_reply_only_touches_empty_assistant() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("stop"));
        assert!(!transcript.fill_empty_reply("Stopped"));

        transcript.append(Message::assistant("Mulch"));
        assert!(!transcript.fill_empty_reply("Stopped"));
        assert_eq!(transcript.last().unwrap().content, "Mulch");

        transcript.append(Message::user("more"));
        transcript.append(Message::assistant(""));
        assert!(transcript.fill_empty_reply("Stopped"));
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript.last().unwrap(), &Message::assistant("Stopped"));
    }
}
