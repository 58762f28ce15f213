//! Configuration management for fsedump.
//!
//! Uses figment to merge configuration from multiple sources:
//! 1. Default values
//! 2. Config file (TOML)
//! 3. Environment variables (`FSEDUMP_`, `__` separates sections)
//! 4. Command-line arguments

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use fsedump_protocol::{DecoderConfig, PidWidth, StreamConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Event device configuration
    #[serde(default)]
    pub device: DeviceConfig,

    /// Record decoding
    #[serde(default)]
    pub decoder: DecoderConfig,

    /// Read loop
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Event device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device node to clone
    #[serde(default = "default_device_path")]
    pub path: PathBuf,

    /// Kernel queue depth requested for the cloned descriptor
    #[serde(default = "default_queue_depth")]
    pub queue_depth: i32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_device_path() -> PathBuf {
    PathBuf::from("/dev/fsevents")
}

fn default_queue_depth() -> i32 {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            device: DeviceConfig::default(),
            decoder: DecoderConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: default_device_path(),
            queue_depth: default_queue_depth(),
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_file: Option<&PathBuf>) -> Result<Self, figment::Error> {
        Self::figment(config_file).extract()
    }

    fn figment(config_file: Option<&PathBuf>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        } else {
            let default_paths = [
                PathBuf::from("/etc/fsedump/config.toml"),
                dirs::config_dir()
                    .unwrap_or_default()
                    .join("fsedump/config.toml"),
            ];

            for path in &default_paths {
                if path.exists() {
                    figment = figment.merge(Toml::file(path));
                    break;
                }
            }
        }

        figment.merge(Env::prefixed("FSEDUMP_").split("__"))
    }

    /// Override log level from CLI
    pub fn with_log_level(mut self, log_level: Option<String>) -> Self {
        if let Some(level) = log_level {
            self.log_level = level;
        }
        self
    }

    /// Override pid width from CLI
    pub fn with_pid_width(mut self, pid_width: Option<PidWidth>) -> Self {
        if let Some(width) = pid_width {
            self.decoder.pid_width = width;
        }
        self
    }

    /// Disable carry-over from CLI. Never re-enables it.
    pub fn with_no_carry_over(mut self, no_carry_over: bool) -> Self {
        if no_carry_over {
            self.stream.carry_over = false;
        }
        self
    }

    /// Override device path from CLI
    pub fn with_device(mut self, path: Option<PathBuf>) -> Self {
        if let Some(p) = path {
            self.device.path = p;
        }
        self
    }

    /// Override queue depth from CLI
    pub fn with_queue_depth(mut self, depth: Option<i32>) -> Self {
        if let Some(d) = depth {
            self.device.queue_depth = d;
        }
        self
    }
}
