//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence; otherwise `LOG_LEVEL` (or the YAML
//! `telemetry.level`) sets the filter. `json_output` switches the fmt layer
//! to one JSON object per line.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub json_output: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json_output: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

pub fn init_subscriber(config: &TelemetryConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}
