//! Streaming Session State
//!
//! One in-flight reasoning stream: the accumulated text, the incremental
//! decoder, and the `closed` flag. Chunks are decoded strictly in arrival
//! order; a multi-byte character split across two chunks is held back until
//! its remaining bytes arrive.

/// Text encodings the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8 (also used for US-ASCII, which is a subset).
    Utf8,
    /// An undeclared or unsupported charset; decoded as lossy UTF-8.
    Fallback,
}

impl TextEncoding {
    /// Encoding for a charset label taken from the response's content type.
    ///
    /// A missing label means UTF-8, the default for `text/plain` streams.
    #[must_use]
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return Self::Utf8;
        };
        match label.trim().trim_matches('"').to_lowercase().as_str() {
            "utf-8" | "utf8" | "us-ascii" | "ascii" => Self::Utf8,
            _ => Self::Fallback,
        }
    }
}

/// Incremental UTF-8 decoder.
#[derive(Debug)]
pub struct TextDecoder {
    encoding: TextEncoding,
    pending: Vec<u8>,
}

impl TextDecoder {
    /// Create a decoder.
    #[must_use]
    pub const fn new(encoding: TextEncoding) -> Self {
        Self {
            encoding,
            pending: Vec::new(),
        }
    }

    /// The decoder's encoding.
    #[must_use]
    pub const fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Decode the next chunk, holding back an incomplete trailing sequence.
    ///
    /// Invalid sequences in the middle of the input become U+FFFD.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // `valid_up_to` marks a valid prefix, so nothing is substituted here.
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        out
    }

    /// Flush whatever is still held back.
    pub fn finish(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}

/// Accumulator for one streaming session.
#[derive(Debug)]
pub struct StreamSession {
    accumulator: String,
    decoder: TextDecoder,
    chunks: u64,
    bytes: u64,
    closed: bool,
}

impl StreamSession {
    /// Open a session for a stream with the given charset label.
    #[must_use]
    pub fn new(charset: Option<&str>) -> Self {
        Self {
            accumulator: String::new(),
            decoder: TextDecoder::new(TextEncoding::from_label(charset)),
            chunks: 0,
            bytes: 0,
            closed: false,
        }
    }

    /// Feed one chunk; returns the newly decoded text, already appended to
    /// the accumulator.
    ///
    /// Chunks pushed after [`Self::close`] are ignored.
    pub fn push(&mut self, chunk: &[u8]) -> String {
        if self.closed {
            return String::new();
        }
        self.chunks += 1;
        self.bytes += chunk.len() as u64;
        let text = self.decoder.decode(chunk);
        self.accumulator.push_str(&text);
        text
    }

    /// End the session and return the trimmed accumulated text.
    pub fn close(&mut self) -> String {
        if !self.closed {
            let tail = self.decoder.finish();
            self.accumulator.push_str(&tail);
            self.closed = true;
        }
        self.accumulator.trim().to_string()
    }

    /// Text accumulated so far, untrimmed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.accumulator
    }

    /// Whether the session has ended.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Chunks received.
    #[must_use]
    pub const fn chunk_count(&self) -> u64 {
        self.chunks
    }

    /// Bytes received.
    #[must_use]
    pub const fn byte_count(&self) -> u64 {
        self.bytes
    }

    /// Encoding in use.
    #[must_use]
    pub const fn encoding(&self) -> TextEncoding {
        self.decoder.encoding()
    }
}
