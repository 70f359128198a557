//! Server-Sent Events (SSE) processing for streamed replies.
//!
//! The dream endpoint streams `data: <json>` lines.  This module turns the raw
//! byte stream of an HTTP response into a stream of parsed [`StreamEvent`]s.
//! Bytes are decoded with a stateful [`Utf8Decoder`] and lines are buffered
//! until their newline arrives, so neither characters nor events may be split
//! by chunk boundaries.
//!
//! A line whose payload is not valid JSON yields an [`Error::Serialization`]
//! item and the stream carries on; a failure of the underlying body yields an
//! [`Error::Streaming`] item and ends the stream.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::decoder::Utf8Decoder;
use crate::observability::STREAM_BYTES;
use crate::{Error, Result, StreamEvent};

/// The prefix that marks a line as an event.
pub const DATA_PREFIX: &str = "data: ";

/// Longest line kept while waiting for its newline.
pub const MAX_LINE_BYTES: usize = 1 << 20;

struct SseState<S> {
    stream: S,
    decoder: Utf8Decoder,
    buffer: String,
    // Bytes of `buffer` already known to hold no newline.
    scanned: usize,
    // Set after an oversized line was dropped; the rest of it is skipped.
    discarding: bool,
    done: bool,
}

impl<S> SseState<S> {
    /// Removes and returns the next complete line, without its terminator.
    fn next_line(&mut self) -> Option<String> {
        loop {
            let Some(offset) = self.buffer[self.scanned..].find('\n') else {
                self.scanned = self.buffer.len();
                return None;
            };
            let newline = self.scanned + offset;
            let mut line: String = self.buffer.drain(..=newline).collect();
            self.scanned = 0;
            if self.discarding {
                self.discarding = false;
                continue;
            }
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            return Some(line);
        }
    }

    /// Drops the partial line if it has grown past [`MAX_LINE_BYTES`].
    fn drop_oversized_line(&mut self) -> bool {
        if self.buffer.len() <= MAX_LINE_BYTES {
            return false;
        }
        self.buffer.clear();
        self.scanned = 0;
        self.discarding = true;
        true
    }
}

/// Process a stream of bytes into a stream of dream events.
///
/// This function takes a byte stream from an HTTP response and converts it into
/// a stream of parsed [`StreamEvent`]s.  Lines that do not start with
/// [`DATA_PREFIX`] are ignored.  A final line without a trailing newline is
/// still processed when the body ends.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<StreamEvent>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    // Convert transport errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let state = SseState {
        stream,
        decoder: Utf8Decoder::new(),
        buffer: String::new(),
        scanned: 0,
        discarding: false,
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            // Drain complete lines before reading more data
            while let Some(line) = state.next_line() {
                if let Some(event) = parse_line(&line) {
                    return Some((event, state));
                }
            }
            if state.drop_oversized_line() {
                let err = Error::serialization(
                    format!("SSE line longer than {MAX_LINE_BYTES} bytes dropped"),
                    None,
                );
                return Some((Err(err), state));
            }
            if state.done {
                return None;
            }

            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    let text = state.decoder.decode(&bytes);
                    state.buffer.push_str(&text);
                }
                Some(Err(e)) => {
                    state.done = true;
                    state.buffer.clear();
                    state.scanned = 0;
                    return Some((Err(e), state));
                }
                None => {
                    state.done = true;
                    let tail = state.decoder.finish();
                    state.buffer.push_str(&tail);
                    if !state.buffer.is_empty() && !state.buffer.ends_with('\n') {
                        state.buffer.push('\n');
                    }
                }
            }
        }
    })
}

/// Parse one line of the body.
///
/// Returns `None` for lines that are not events.
fn parse_line(line: &str) -> Option<Result<StreamEvent>> {
    let data = line.strip_prefix(DATA_PREFIX)?;
    Some(serde_json::from_str::<StreamEvent>(data).map_err(|e| {
        Error::serialization(
            format!("Malformed SSE event '{data}': {e}"),
            Some(Box::new(e)),
        )
    }))
}
