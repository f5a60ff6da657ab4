//! HTTP wire types.
//!
//! Request bodies mirror what the SkillSpark frontend sends. Optional fields
//! fall back to the same defaults the frontend assumes, so a bare
//! `{"messages": [...]}` is a complete chat request.

use serde::{Deserialize, Deserializer, Serialize};
use skillspark_providers::{
    ChatMessage, ImageParams, ModelTier, TextParams, DEFAULT_CHAT_MODEL, DEFAULT_TEMPERATURE,
};
use tracing::debug;

/// Response language. Anything other than `zh-TW` (including `null`) is English.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Option<String>")]
pub enum Language {
    #[default]
    En,
    ZhTw,
}

impl From<Option<String>> for Language {
    fn from(value: Option<String>) -> Self {
        match value.as_deref() {
            Some("zh-TW") => Self::ZhTw,
            _ => Self::En,
        }
    }
}

/// An explicit `null` gets the same default as a missing field.
fn null_as_default<'de, D, T>(deserializer: D, default: fn() -> T) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_else(default))
}

fn default_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

fn model_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    null_as_default(deserializer, default_model)
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn temperature_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    null_as_default(deserializer, default_temperature)
}

/// Request body for `POST /api/ai/chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_model", deserialize_with = "model_or_default")]
    pub model: String,
    #[serde(
        default = "default_temperature",
        deserialize_with = "temperature_or_default"
    )]
    pub temperature: f64,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Out-of-range temperatures and unknown models are forwarded as given;
    /// DashScope decides what to do with them.
    pub fn log_pass_through(&self) {
        if ModelTier::from_model_id(&self.model).is_none() {
            debug!(model = %self.model, "forwarding unrecognized model");
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            debug!(temperature = self.temperature, "forwarding out-of-range temperature");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    BlogPost,
    ToolDescription,
    SeoContent,
}

fn default_max_length() -> u32 {
    2000
}

fn max_length_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    null_as_default(deserializer, default_max_length)
}

/// Request body for `POST /api/ai/generate-text`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateTextRequest {
    pub prompt: String,
    pub job_type: JobType,
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(
        default = "default_max_length",
        deserialize_with = "max_length_or_default"
    )]
    pub max_length: u32,
}

impl GenerateTextRequest {
    pub fn to_params(&self) -> TextParams {
        TextParams::new(self.prompt.clone(), self.max_length)
    }
}

fn default_dimension() -> u32 {
    1024
}

fn dimension_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    null_as_default(deserializer, default_dimension)
}

/// Request body for `POST /api/ai/generate-image`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateImageRequest {
    pub prompt: String,
    #[serde(default = "default_dimension", deserialize_with = "dimension_or_default")]
    pub width: u32,
    #[serde(default = "default_dimension", deserialize_with = "dimension_or_default")]
    pub height: u32,
    #[serde(default)]
    pub style: Option<String>,
}

impl GenerateImageRequest {
    pub fn to_params(&self) -> ImageParams {
        ImageParams::new(self.prompt.clone(), self.width, self.height)
            .with_style(self.style.clone())
    }
}

/// Envelope for the one-shot generation endpoints. Always sent with 200;
/// `success` carries the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub job_id: Option<String>,
    pub error: Option<String>,
}

impl GenerationResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            job_id: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            job_id: None,
            error: Some(error.into()),
        }
    }
}

/// Response body for `GET /api/ai/jobs/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub status: String,
    pub job_id: String,
}

/// Response body for `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
}

/// Error body for requests rejected before any work starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
