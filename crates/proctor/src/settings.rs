//! Layered settings: defaults, optional file, then `PROCTOR__*` environment

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use event_sink::MqttConfig;
use integrity::IntegrityConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub integrity: IntegrityConfig,
    pub logging: LoggingSettings,
    pub sink: SinkSettings,
    pub recording: RecordingSettings,
    pub metrics: MetricsSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// trace, debug, info, warn or error
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Log,
    Memory,
    Mqtt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    pub kind: SinkKind,
    /// Retention of the in-memory log
    pub memory_capacity: usize,
    pub mqtt: MqttConfig,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            kind: SinkKind::Log,
            memory_capacity: 10_000,
            mqtt: MqttConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    /// Where session recordings are handed off; none disables hand-off
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Prometheus scrape address; none disables the exporter
    pub listen: Option<SocketAddr>,
}

impl Settings {
    /// Load from an optional file plus the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_sources(path, Self::environment())
    }

    /// `PROCTOR__SINK__KIND=mqtt` sets `sink.kind`
    pub fn environment() -> Environment {
        Environment::with_prefix("PROCTOR")
            .separator("__")
            .try_parsing(true)
    }

    pub fn from_sources(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: Settings = builder.add_source(env).build()?.try_deserialize()?;

        settings
            .integrity
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(settings)
    }
}
