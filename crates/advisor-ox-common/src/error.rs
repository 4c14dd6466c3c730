use thiserror::Error;

/// Errors that can occur while talking to the advisory backend over HTTP
#[derive(Error, Debug)]
pub enum CommonRequestError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status {
        /// Numeric HTTP status code
        status: u16,
        /// Message extracted from the error body, or the raw body
        message: String,
    },

    /// Error originating from the request builder
    #[error("Request builder error: {0}")]
    RequestBuilder(String),
}

/// Parse error response from HTTP status and body
pub fn parse_error_response(status: reqwest::StatusCode, body: &bytes::Bytes) -> CommonRequestError {
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|json| extract_error_message(&json))
        .unwrap_or_else(|| {
            let raw = String::from_utf8_lossy(body).trim().to_string();
            if raw.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                raw
            }
        });

    CommonRequestError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Extract error message from the JSON error shapes the backend and its proxies produce
fn extract_error_message(json: &serde_json::Value) -> Option<String> {
    if let Some(error) = json.get("error") {
        // Flask backend: {"success": false, "error": "..."}
        if let Some(msg) = error.as_str() {
            return Some(msg.to_string());
        }

        // Proxy style: {"error": {"message": "..."}}
        if let Some(msg) = error.get("message").and_then(|m| m.as_str()) {
            return Some(msg.to_string());
        }
    }

    // Generic message field
    json.get("message")
        .and_then(|m| m.as_str())
        .map(ToString::to_string)
}
