use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One JSON record from the chat event stream.
///
/// Every field is optional: text-bearing records carry `chunk`, the backend's closing
/// record carries `done` and `full_response`, and failures carry `success: false` with
/// an `error` message. Only `chunk` is typed strictly; the side fields are kept as raw
/// JSON so an unexpected shape there never costs the text fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_response: Option<Value>,
}

impl ChatChunk {
    /// Text to append to the reply, if any
    pub fn fragment(&self) -> Option<&str> {
        self.chunk.as_deref().filter(|text| !text.is_empty())
    }

    /// Failure reported by the backend inside the stream
    pub fn failure(&self) -> Option<String> {
        let error = self.error.as_ref().filter(|error| !error.is_null());
        match (error, &self.success) {
            (Some(error), _) => Some(match self.details.as_ref().filter(|d| !d.is_null()) {
                Some(details) => format!("{} ({})", text_of(error), text_of(details)),
                None => text_of(error),
            }),
            (None, Some(Value::Bool(false))) => Some("request was not successful".to_string()),
            _ => None,
        }
    }

    /// Whether this record closes the stream
    pub fn is_final(&self) -> bool {
        self.done == Some(Value::Bool(true))
    }
}

/// Strings as-is, anything else as compact JSON
fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
