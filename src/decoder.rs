//! Incremental UTF-8 decoding for response bodies.
//!
//! Network chunks do not respect character boundaries.  [`Utf8Decoder`] keeps
//! the incomplete tail of one chunk and prepends it to the next, so a
//! multi-byte character split across two reads decodes as one character.
//! Bytes that can never form a character become U+FFFD rather than failing
//! the stream.

use std::char::REPLACEMENT_CHARACTER;

/// A stateful UTF-8 decoder.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Creates a decoder with no carried-over bytes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes as much of `chunk` as forms complete characters.
    ///
    /// An incomplete sequence at the end is held back until the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::with_capacity(self.pending.len());
        let mut input = &self.pending[..];
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    input = &[];
                    break;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    if let Ok(valid) = std::str::from_utf8(valid) {
                        out.push_str(valid);
                    }
                    match err.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        None => {
                            input = rest;
                            break;
                        }
                    }
                }
            }
        }
        self.pending = input.to_vec();
        out
    }

    /// Flushes the decoder at end of input.
    ///
    /// A sequence still incomplete when the body ends decodes as U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            REPLACEMENT_CHARACTER.to_string()
        }
    }

    /// Returns the number of bytes held back from the previous chunk.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
