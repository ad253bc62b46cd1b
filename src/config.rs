use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TelemetryError};
use crate::system::verbosity::Verbosity;

pub const DEFAULT_KEEP_ALIVE_SECS: f32 = 5.0;
/// Sized so that one flushed packet fits a single UDP datagram.
pub const DEFAULT_BUFFER_SIZE: usize = 1400;

/// Runtime settings for the telemetry system and its streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Idle time after which `update()` flushes a heartbeat packet.
    pub keep_alive_secs: f32,
    pub game_name: String,
    /// Capture file path. Empty or starting with `'0'` disables the file stream.
    pub stream_file: String,
    /// `host:port` of a UDP collector. Empty or starting with `'0'` disables it.
    pub stream_ip: String,
    pub buffer_size: usize,
    pub global_verbosity: Verbosity,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            keep_alive_secs: DEFAULT_KEEP_ALIVE_SECS,
            game_name: "nexus".to_string(),
            stream_file: String::new(),
            stream_ip: String::new(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            global_verbosity: Verbosity::Default,
        }
    }
}

impl TelemetryConfig {
    /// Loads a JSON config. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| TelemetryError::Config(e.to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| TelemetryError::Config(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::try_from_secs_f32(self.keep_alive_secs).unwrap_or(Duration::ZERO)
    }
}

/// Stream settings use `""` or a leading `'0'` to mean "off".
pub fn stream_setting_enabled(value: &str) -> bool {
    !value.is_empty() && !value.starts_with('0')
}
