//! Line-oriented SSE de-framing.
//!
//! DashScope streams generation results as Server-Sent Events:
//!
//! ```text
//! id:1
//! event:result
//! :HTTP_STATUS/200
//! data:{"output":{"choices":[{"delta":{"content":"Hi"}}]}}
//!
//! data: [DONE]
//! ```
//!
//! Network chunks do not line up with lines (or even with UTF-8 character
//! boundaries), so bytes are buffered until a newline arrives and only then
//! decoded.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

const DATA_PREFIX: &str = "data:";
const COMMENT_PREFIX: char = ':';
const DONE_SENTINEL: &str = "[DONE]";

/// Longest line kept in memory. Anything longer is dropped up to its newline.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into text lines.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no newline
    scanned: usize,
    max_line: usize,
    discarding: bool,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_line,
            discarding: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete line, without its terminator.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') else {
                self.scanned = self.buffer.len();
                if self.buffer.len() > self.max_line {
                    warn!(
                        buffered = self.buffer.len(),
                        limit = self.max_line,
                        "dropping overlong upstream line"
                    );
                    self.buffer.clear();
                    self.scanned = 0;
                    self.discarding = true;
                }
                return None;
            };

            let idx = self.scanned + offset;
            let line: Vec<u8> = self.buffer.drain(..=idx).collect();
            self.scanned = 0;

            // Tail of a line that was already dropped
            if std::mem::take(&mut self.discarding) {
                continue;
            }
            return Some(decode_line(&line[..idx]));
        }
    }

    /// Whatever is left once the body has ended, if anything.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        if std::mem::take(&mut self.discarding) || rest.is_empty() {
            return None;
        }
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// One upstream line, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamEnvelope {
    /// Blank line
    KeepAlive,
    /// `:`-prefixed line
    Comment,
    /// `event:`, `id:`, `retry:` and anything else we do not act on
    Field,
    /// `data: [DONE]`
    Done,
    /// `data:` line whose payload is not JSON
    Malformed(String),
    Data(Value),
}

impl UpstreamEnvelope {
    pub fn parse(line: &str) -> Self {
        if line.trim().is_empty() {
            return Self::KeepAlive;
        }
        if line.starts_with(COMMENT_PREFIX) {
            return Self::Comment;
        }
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return Self::Field;
        };

        let payload = payload.trim();
        if payload == DONE_SENTINEL {
            return Self::Done;
        }

        match serde_json::from_str(payload) {
            Ok(value) => Self::Data(value),
            Err(_) => Self::Malformed(payload.to_string()),
        }
    }
}

/// What a well-formed data payload carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Fragment(String),
    /// Error object sent in place of output, e.g. after `event:error`
    Failure { code: String, message: String },
    Nothing,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    output: Option<StreamOutput>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamOutput {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

/// A choice may carry an incremental `delta`, a full `message`, or both.
#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<ContentField>,
    #[serde(default)]
    message: Option<ContentField>,
}

impl StreamChoice {
    /// Delta text when it has any, otherwise the full message text.
    fn into_text(self) -> Option<String> {
        let delta = self.delta.and_then(|d| d.content).filter(|t| !t.is_empty());
        match delta {
            Some(text) => Some(text),
            None => self.message.and_then(|m| m.content),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContentField {
    #[serde(default)]
    content: Option<String>,
}

pub fn extract(payload: &Value) -> Extraction {
    let Ok(event) = StreamEvent::deserialize(payload) else {
        return Extraction::Nothing;
    };

    let Some(output) = event.output else {
        return match event.code {
            Some(code) if !code.is_empty() => Extraction::Failure {
                code,
                message: event.message.unwrap_or_default(),
            },
            _ => Extraction::Nothing,
        };
    };

    let text = output
        .choices
        .into_iter()
        .next()
        .and_then(StreamChoice::into_text);

    match text {
        Some(text) if !text.is_empty() => Extraction::Fragment(text),
        _ => Extraction::Nothing,
    }
}
