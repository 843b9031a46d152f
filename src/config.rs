use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

fn default_sample_rate() -> u32 {
    44_100
}

fn default_channels() -> u32 {
    2
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_publish_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct RtmpConfig {
    /// `rtmp://host[:port]/app/stream_key`
    pub url: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,
}

impl RtmpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggerFormat {
    Pretty,
    Json,
    Compact,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "default_stdio_level")]
    pub stdio_level: String,
    #[serde(default = "default_logger_format")]
    pub format: LoggerFormat,
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_file_level")]
    pub file_level: String,
}

fn default_stdio_level() -> String {
    "info".to_string()
}

fn default_file_level() -> String {
    "debug".to_string()
}

fn default_logger_format() -> LoggerFormat {
    LoggerFormat::Pretty
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            stdio_level: default_stdio_level(),
            format: default_logger_format(),
            log_file: None,
            file_level: default_file_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub rtmp: RtmpConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub logger: LoggerConfig,
}

/// Reads configuration from the path in `LIVE_PUBLISH_CONFIG`, defaulting to
/// `./live_publish.json` in the current directory.
pub fn read_config() -> Config {
    let path = std::env::var("LIVE_PUBLISH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("live_publish.json"));
    let contents = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read config file {}: {e}", path.display()));
    serde_json::from_str(&contents)
        .unwrap_or_else(|e| panic!("failed to parse config file {}: {e}", path.display()))
}
