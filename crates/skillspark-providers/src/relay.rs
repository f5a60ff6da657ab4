//! Streaming chat relay.
//!
//! Turns an upstream SSE body into a lazy sequence of text fragments. Each
//! poll pulls at most as many bytes as needed to produce the next fragment,
//! so consumer backpressure reaches the upstream socket directly. Dropping
//! the stream drops the body and closes the connection.

use async_stream::try_stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::trace;

use crate::sse::{extract, Extraction, LineDecoder, UpstreamEnvelope};
use crate::{ProviderError, ProviderResult};

enum LineOutcome {
    Fragment(String),
    Skip,
    Done,
}

fn handle_line(line: &str) -> ProviderResult<LineOutcome> {
    match UpstreamEnvelope::parse(line) {
        UpstreamEnvelope::KeepAlive | UpstreamEnvelope::Comment | UpstreamEnvelope::Field => {
            Ok(LineOutcome::Skip)
        }
        UpstreamEnvelope::Done => Ok(LineOutcome::Done),
        UpstreamEnvelope::Malformed(payload) => {
            trace!(payload = %payload, "skipping malformed upstream line");
            Ok(LineOutcome::Skip)
        }
        UpstreamEnvelope::Data(value) => match extract(&value) {
            Extraction::Fragment(text) => Ok(LineOutcome::Fragment(text)),
            Extraction::Nothing => Ok(LineOutcome::Skip),
            Extraction::Failure { code, message } => {
                Err(ProviderError::StreamFailure { code, message })
            }
        },
    }
}

/// Relay an SSE byte stream as text fragments.
///
/// Ends normally at `data: [DONE]` (nothing after it is read) or at
/// end-of-body. Malformed data lines are skipped. Transport errors end the
/// stream with that error.
pub fn fragments<S, E>(body: S) -> impl Stream<Item = ProviderResult<String>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: Into<ProviderError> + Send,
{
    try_stream! {
        futures::pin_mut!(body);
        let mut decoder = LineDecoder::new();
        let mut done = false;

        'read: while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(Into::<ProviderError>::into)?;
            decoder.push(&chunk);

            while let Some(line) = decoder.next_line() {
                match handle_line(&line)? {
                    LineOutcome::Fragment(text) => yield text,
                    LineOutcome::Skip => {}
                    LineOutcome::Done => {
                        done = true;
                        break 'read;
                    }
                }
            }
        }

        // Body ended without a trailing newline.
        if !done {
            if let Some(line) = decoder.finish() {
                if let LineOutcome::Fragment(text) = handle_line(&line)? {
                    yield text;
                }
            }
        }
    }
}
