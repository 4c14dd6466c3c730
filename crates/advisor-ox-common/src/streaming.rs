use futures_util::{Stream, StreamExt};

/// Payload that marks the end of the stream rather than carrying data
pub const DONE_SENTINEL: &str = "[DONE]";

/// One decoded server-sent event block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// The `data:` payload of a block, multiple data lines joined with `\n`
    Data(String),
    /// The `[DONE]` sentinel
    Done,
}

/// Accumulates raw bytes and hands out complete blank-line terminated blocks.
///
/// Bytes are kept undecoded until a whole block is available, so a multi-byte character
/// split across two reads is reassembled before any UTF-8 decoding happens.
#[derive(Debug, Default)]
pub struct EventBuffer {
    buffer: Vec<u8>,
    /// Offset before which no delimiter can start
    scanned: usize,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk read from the network
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Remove and return the next complete block, without its delimiter
    pub fn next_block(&mut self) -> Option<Vec<u8>> {
        let Some((start, len)) = find_delimiter(&self.buffer, self.scanned) else {
            // The last three bytes may begin a delimiter completed by the next push
            self.scanned = self.buffer.len().saturating_sub(3);
            return None;
        };
        self.scanned = 0;
        let mut block: Vec<u8> = self.buffer.drain(..start + len).collect();
        block.truncate(start);
        Some(block)
    }

    /// Take whatever is left once the stream has ended.
    ///
    /// Returns `None` when only whitespace remains.
    pub fn take_remainder(&mut self) -> Option<Vec<u8>> {
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        if rest.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(rest)
        }
    }
}

/// Position and length of the first blank-line delimiter (`\n\n` or `\r\n\r\n`) at or
/// after `from`
fn find_delimiter(buffer: &[u8], from: usize) -> Option<(usize, usize)> {
    (from..buffer.len()).find_map(|i| {
        let rest = &buffer[i..];
        if rest.starts_with(b"\n\n") {
            Some((i, 2))
        } else if rest.starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else {
            None
        }
    })
}

/// Decode one block of text into a frame.
///
/// Comment lines and fields other than `data` are ignored. Blocks without any data
/// line, or whose data is empty, yield `None`.
pub fn parse_block(block: &str) -> Option<SseFrame> {
    let mut data_lines = Vec::new();

    for line in block.lines() {
        let line = line.trim_end_matches('\r');

        if line.starts_with(':') {
            continue;
        }

        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    let payload = data_lines.join("\n");
    let payload = payload.trim();

    if payload.is_empty() {
        None
    } else if payload == DONE_SENTINEL {
        Some(SseFrame::Done)
    } else {
        Some(SseFrame::Data(payload.to_string()))
    }
}

/// Decode a raw block, dropping it with a warning if it is not valid UTF-8
fn decode_block(block: &[u8]) -> Option<SseFrame> {
    match std::str::from_utf8(block) {
        Ok(text) => parse_block(text),
        Err(e) => {
            log::warn!("Skipping event block with invalid UTF-8: {e}");
            None
        }
    }
}

/// Server-Sent Events parser over any byte stream
pub struct SseParser<S> {
    byte_stream: S,
    buffer: EventBuffer,
    finished: bool,
}

impl<S, E> SseParser<S>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
{
    pub fn new(byte_stream: S) -> Self {
        Self {
            byte_stream,
            buffer: EventBuffer::new(),
            finished: false,
        }
    }

    /// Get the next frame from the stream.
    ///
    /// Returns `Ok(None)` once the underlying stream is exhausted and every buffered
    /// block has been handed out. Errors from the byte stream are passed through as-is.
    pub async fn next_frame(&mut self) -> Result<Option<SseFrame>, E> {
        loop {
            while let Some(block) = self.buffer.next_block() {
                if let Some(frame) = decode_block(&block) {
                    return Ok(Some(frame));
                }
            }

            if self.finished {
                return Ok(None);
            }

            if let Some(chunk) = self.byte_stream.next().await {
                self.buffer.push(&chunk?);
            } else {
                self.finished = true;
                // An unterminated trailing block still counts
                if let Some(frame) = self.buffer.take_remainder().as_deref().and_then(decode_block) {
                    return Ok(Some(frame));
                }
                return Ok(None);
            }
        }
    }
}
