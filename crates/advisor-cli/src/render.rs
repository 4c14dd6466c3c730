use advisor_ox::{Role, Transcript};

pub const ASSISTANT_LABEL: &str = "advisor> ";

/// Turns successive transcript snapshots into terminal output.
///
/// Relies on the transcript only growing: everything up to the remembered message count
/// and the remembered length of the last message has already been written. Snapshots
/// may skip intermediate states without losing text.
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    printed_messages: usize,
    printed_bytes: usize,
}

impl TranscriptPrinter {
    /// Output for everything added since the previous call.
    ///
    /// User messages are skipped; the user already typed them.
    pub fn render(&mut self, transcript: &Transcript) -> String {
        let messages = transcript.messages();
        let mut out = String::new();

        if let Some(current) = self.printed_messages.checked_sub(1).and_then(|i| messages.get(i)) {
            if current.role == Role::Assistant {
                if let Some(rest) = current.content.get(self.printed_bytes..) {
                    out.push_str(rest);
                }
            }
        }

        for message in messages.iter().skip(self.printed_messages) {
            if message.role == Role::Assistant {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(ASSISTANT_LABEL);
                out.push_str(&message.content);
            }
        }

        if messages.len() > self.printed_messages || !out.is_empty() {
            self.printed_messages = messages.len();
            self.printed_bytes = messages.last().map_or(0, |m| m.content.len());
        }

        out
    }
}
