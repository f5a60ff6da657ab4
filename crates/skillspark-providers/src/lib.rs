//! SkillSpark Providers - DashScope generation client
//!
//! This crate talks to Alibaba Cloud's DashScope API:
//! - streaming chat completions, relayed as a lazy stream of text fragments
//! - one-shot text generation (Qwen)
//! - image generation (Wanx)

mod config;
mod dashscope;
mod error;
pub mod relay;
mod response_handling;
pub mod sse;
mod traits;
mod types;

pub use config::{ProviderConfig, DEFAULT_BASE_URL};
pub use dashscope::DashScopeClient;
pub use error::ProviderError;
pub use response_handling::{classify_status, extract_retry_after};
pub use secrecy::SecretString;
pub use traits::{FragmentStream, GenerationClient, ProviderResult};
pub use types::{
    ChatMessage, ChatParams, ImageParams, ModelTier, Role, TextParams, DEFAULT_CHAT_MODEL,
    DEFAULT_TEMPERATURE, IMAGE_MODEL, TEXT_MODEL,
};
