//! Generation client traits

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::{ChatParams, ImageParams, ProviderError, TextParams};

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Lazy, forward-only stream of text fragments from a chat completion
pub type FragmentStream = Pin<Box<dyn Stream<Item = ProviderResult<String>> + Send>>;

/// Trait for generation backends
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Fail with a configuration error if the client cannot make calls at all.
    /// Never touches the network.
    fn ensure_configured(&self) -> ProviderResult<()>;

    /// Open a streaming chat completion.
    ///
    /// Status failures are reported here, before the first fragment.
    /// Transport failures after that arrive as stream items.
    async fn chat_stream(&self, params: ChatParams) -> ProviderResult<FragmentStream>;

    /// One-shot text generation
    async fn generate_text(&self, params: TextParams) -> ProviderResult<String>;

    /// One-shot image generation, returns the image URL
    async fn generate_image(&self, params: ImageParams) -> ProviderResult<String>;

    /// Get the provider name
    fn provider(&self) -> &str;
}
