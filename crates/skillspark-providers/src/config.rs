//! Provider configuration

use secrecy::SecretString;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";

/// Configuration for the DashScope client
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// DashScope API key (format: sk-...). Calls fail fast without it.
    pub api_key: Option<SecretString>,
    pub base_url: String,
    /// Applies to every call, including the streaming one
    pub connect_timeout_seconds: u64,
    /// Total timeout for one-shot text generation
    pub text_timeout_seconds: u64,
    /// Total timeout for image generation, which is slower
    pub image_timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_seconds: 10,
            text_timeout_seconds: 60,
            image_timeout_seconds: 120,
        }
    }
}

impl ProviderConfig {
    pub fn dashscope(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(SecretString::from(api_key.into())),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: Option<SecretString>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_connect_timeout(mut self, seconds: u64) -> Self {
        self.connect_timeout_seconds = seconds;
        self
    }

    pub fn with_text_timeout(mut self, seconds: u64) -> Self {
        self.text_timeout_seconds = seconds;
        self
    }

    pub fn with_image_timeout(mut self, seconds: u64) -> Self {
        self.image_timeout_seconds = seconds;
        self
    }

    pub fn base_url_trimmed(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn text_timeout(&self) -> Duration {
        Duration::from_secs(self.text_timeout_seconds)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_seconds)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("base_url must not be empty".to_string());
        }

        for (name, value) in [
            ("connect_timeout", self.connect_timeout_seconds),
            ("text_timeout", self.text_timeout_seconds),
            ("image_timeout", self.image_timeout_seconds),
        ] {
            if value == 0 {
                return Err(format!("{} must be greater than 0", name));
            }
        }

        Ok(())
    }
}
