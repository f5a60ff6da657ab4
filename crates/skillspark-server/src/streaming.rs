//! Streaming chat re-framing (SSE).
//!
//! The relay hands us plain text fragments. The frontend expects the
//! OpenAI chat-completion chunk shape, one event per fragment, followed by a
//! terminal marker:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//!
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//!
//! data: [DONE]
//!
//! ```
//!
//! The HTTP status is already 200 by the time anything can fail, so failures
//! are sent in-band as a single error event that replaces `[DONE]`.

use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde_json::json;
use skillspark_providers::{ChatParams, GenerationClient, ProviderError, ProviderResult};
use tracing::{debug, warn};

pub const DONE_EVENT: &str = "data: [DONE]\n\n";

pub fn delta_event(fragment: &str) -> String {
    sse_data(&json!({"choices": [{"delta": {"content": fragment}}]}))
}

pub fn error_event(error: &ProviderError) -> String {
    sse_data(&json!({"error": {"message": error.to_string(), "type": "api_error"}}))
}

fn sse_data(data: &serde_json::Value) -> String {
    format!("data: {}\n\n", data)
}

/// Frame relay fragments as SSE events, ending with either `[DONE]` or
/// exactly one error event.
pub fn frame_fragments<S>(fragments: S) -> impl Stream<Item = String> + Send
where
    S: Stream<Item = ProviderResult<String>> + Send,
{
    stream! {
        futures::pin_mut!(fragments);
        let mut count = 0usize;

        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) => {
                    count += 1;
                    yield delta_event(&fragment);
                }
                Err(e) => {
                    warn!(error = %e, fragments = count, "chat stream failed");
                    yield error_event(&e);
                    return;
                }
            }
        }

        debug!(fragments = count, "chat stream finished");
        yield DONE_EVENT.to_string();
    }
}

/// Open the upstream chat stream and frame it. Nothing happens until the
/// response body is first polled; setup failures become the error event.
pub fn chat_events(
    client: Arc<dyn GenerationClient>,
    params: ChatParams,
) -> impl Stream<Item = String> + Send {
    stream! {
        match client.chat_stream(params).await {
            Ok(fragments) => {
                let events = frame_fragments(fragments);
                futures::pin_mut!(events);
                while let Some(event) = events.next().await {
                    yield event;
                }
            }
            Err(e) => {
                warn!(
                    provider = client.provider(),
                    error = %e,
                    status = ?e.status(),
                    retry_after_ms = ?e.retry_after_ms(),
                    "failed to open chat stream"
                );
                yield error_event(&e);
            }
        }
    }
}
