//! Configuration from environment variables and an optional YAML file.
//!
//! **Environment variables:**
//! - `HOST`: bind address (default: 0.0.0.0)
//! - `PORT`: server port (default: 8000)
//! - `ALICLOUD_API_KEY`: DashScope API key. The server starts without it, but
//!   every AI call then fails with a configuration error.
//! - `DASHSCOPE_BASE_URL`: DashScope API base (default: https://dashscope.aliyuncs.com/api/v1)
//! - `CONNECT_TIMEOUT_SECS`: upstream connect timeout (default: 10)
//! - `TEXT_TIMEOUT_SECS`: text generation timeout (default: 60)
//! - `IMAGE_TIMEOUT_SECS`: image generation timeout (default: 120)
//! - `LOG_LEVEL`: log filter when `RUST_LOG` is unset (default: info)
//! - `LOG_JSON`: emit JSON log lines (default: false)
//! - `SKILLSPARK_CONFIG`: path to a YAML file overriding any of the above
//!
//! ```yaml
//! server:
//!   port: 9000
//! dashscope:
//!   base_url: "https://dashscope-intl.aliyuncs.com/api/v1"
//!   text_timeout_secs: 90
//! telemetry:
//!   level: debug
//!   json_output: true
//! ```

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use skillspark_providers::{ProviderConfig, DEFAULT_BASE_URL};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::telemetry::TelemetryConfig;

pub const CONFIG_PATH_ENV: &str = "SKILLSPARK_CONFIG";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_key: Option<SecretString>,
    pub dashscope_base_url: String,
    pub connect_timeout_secs: u64,
    pub text_timeout_secs: u64,
    pub image_timeout_secs: u64,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    #[serde(default)]
    server: YamlServer,
    #[serde(default)]
    dashscope: YamlDashScope,
    #[serde(default)]
    telemetry: Option<TelemetryConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlServer {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlDashScope {
    api_key: Option<String>,
    base_url: Option<String>,
    connect_timeout_secs: Option<u64>,
    text_timeout_secs: Option<u64>,
    image_timeout_secs: Option<u64>,
}

/// Blank keys count as missing, wherever they come from.
fn non_blank_key(key: String) -> Option<SecretString> {
    if key.trim().is_empty() {
        None
    } else {
        Some(SecretString::from(key))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }
}

impl ServerConfig {
    /// Build from a variable lookup, `env::var` in production.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };

        Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            api_key: lookup("ALICLOUD_API_KEY").and_then(non_blank_key),
            dashscope_base_url: lookup("DASHSCOPE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            connect_timeout_secs: parsed("CONNECT_TIMEOUT_SECS", 10),
            text_timeout_secs: parsed("TEXT_TIMEOUT_SECS", 60),
            image_timeout_secs: parsed("IMAGE_TIMEOUT_SECS", 120),
            telemetry: TelemetryConfig {
                level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
                json_output: lookup("LOG_JSON")
                    .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                    .unwrap_or(false),
            },
        }
    }

    /// Environment defaults, overlaid by the YAML file named in
    /// `SKILLSPARK_CONFIG` when set.
    pub fn load() -> Result<Self> {
        match env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::default().with_yaml_file(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn with_yaml_file(self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        self.with_yaml_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))
    }

    pub fn with_yaml_str(mut self, content: &str) -> Result<Self> {
        let yaml: YamlConfig = serde_yaml_ng::from_str(content)?;

        if let Some(host) = yaml.server.host {
            self.host = host;
        }
        if let Some(port) = yaml.server.port {
            self.port = port;
        }
        if let Some(api_key) = yaml.dashscope.api_key {
            self.api_key = non_blank_key(api_key);
        }
        if let Some(base_url) = yaml.dashscope.base_url {
            self.dashscope_base_url = base_url;
        }
        if let Some(secs) = yaml.dashscope.connect_timeout_secs {
            self.connect_timeout_secs = secs;
        }
        if let Some(secs) = yaml.dashscope.text_timeout_secs {
            self.text_timeout_secs = secs;
        }
        if let Some(secs) = yaml.dashscope.image_timeout_secs {
            self.image_timeout_secs = secs;
        }
        if let Some(telemetry) = yaml.telemetry {
            self.telemetry = telemetry;
        }

        Ok(self)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::default()
            .with_api_key(self.api_key.clone())
            .with_base_url(self.dashscope_base_url.clone())
            .with_connect_timeout(self.connect_timeout_secs)
            .with_text_timeout(self.text_timeout_secs)
            .with_image_timeout(self.image_timeout_secs)
    }
}
