//! Chat/generation parameters and the DashScope request shapes.
//!
//! Every DashScope generation call shares one envelope:
//!
//! ```json
//! {"model": "...", "input": {...}, "parameters": {...}}
//! ```
//!
//! `input` carries either `messages` (text generation) or `prompt` (image
//! generation).

use serde::{Deserialize, Serialize};

pub const DEFAULT_CHAT_MODEL: &str = ModelTier::Balanced.model_id();
pub const TEXT_MODEL: &str = DEFAULT_CHAT_MODEL;
pub const IMAGE_MODEL: &str = "wanx-v1";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// A message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Qwen model tiers. Requests may name any model, these are the ones we know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Fast,
    Balanced,
    MaxQuality,
}

impl ModelTier {
    pub const fn model_id(self) -> &'static str {
        match self {
            Self::Fast => "qwen-turbo",
            Self::Balanced => "qwen-plus",
            Self::MaxQuality => "qwen-max",
        }
    }

    pub const ALL: [Self; 3] = [Self::Fast, Self::Balanced, Self::MaxQuality];

    pub fn from_model_id(model: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.model_id() == model)
    }
}

/// Parameters for a streaming chat completion. `messages` is sent in order
/// and unchanged.
#[derive(Debug, Clone)]
pub struct ChatParams {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct TextParams {
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl TextParams {
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            model: TEXT_MODEL.to_string(),
            max_tokens,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageParams {
    pub prompt: String,
    pub model: String,
    pub width: u32,
    pub height: u32,
    pub style: Option<String>,
}

impl ImageParams {
    pub fn new(prompt: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            prompt: prompt.into(),
            model: IMAGE_MODEL.to_string(),
            width,
            height,
            style: None,
        }
    }

    pub fn with_style(mut self, style: Option<String>) -> Self {
        self.style = style;
        self
    }

    /// DashScope wants `W*H`.
    pub fn size(&self) -> String {
        format!("{}*{}", self.width, self.height)
    }
}

// Wire types

#[derive(Debug, Serialize)]
pub(crate) struct GenerationPayload<'a, I, P> {
    pub model: &'a str,
    pub input: I,
    pub parameters: P,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessagesInput<'a> {
    pub messages: &'a [ChatMessage],
}

#[derive(Debug, Serialize)]
pub(crate) struct PromptInput<'a> {
    pub prompt: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatParameters {
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub result_format: &'static str,
    pub incremental_output: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct TextParameters {
    pub max_tokens: u32,
    pub temperature: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImageParameters<'a> {
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<&'a str>,
}

impl ChatParams {
    pub(crate) fn payload(&self) -> GenerationPayload<'_, MessagesInput<'_>, ChatParameters> {
        GenerationPayload {
            model: &self.model,
            input: MessagesInput {
                messages: &self.messages,
            },
            parameters: ChatParameters {
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                result_format: "message",
                incremental_output: true,
            },
        }
    }
}

impl TextParams {
    pub(crate) fn messages(&self) -> Vec<ChatMessage> {
        vec![ChatMessage::user(self.prompt.clone())]
    }

    pub(crate) fn parameters(&self) -> TextParameters {
        TextParameters {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

impl ImageParams {
    pub(crate) fn payload(&self) -> GenerationPayload<'_, PromptInput<'_>, ImageParameters<'_>> {
        GenerationPayload {
            model: &self.model,
            input: PromptInput {
                prompt: &self.prompt,
            },
            parameters: ImageParameters {
                size: self.size(),
                style: self.style.as_deref(),
            },
        }
    }
}
