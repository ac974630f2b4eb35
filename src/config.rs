//! Application configuration
//!
//! Loaded from an optional JSON file. Every section has defaults, so a
//! partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::session::{GameRules, PromptTiming};

/// Which duration schedule a host runs with unless `timing` is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Terminal game: 3s prompts down to 1s
    Standalone,
    /// Network game: 5s prompts down to 3s
    Web,
}

impl Profile {
    pub fn timing(self) -> PromptTiming {
        match self {
            Profile::Standalone => PromptTiming::standalone(),
            Profile::Web => PromptTiming::web(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub game: GameRules,
    /// Overrides the profile's schedule when present
    pub timing: Option<PromptTiming>,
    pub host: HostConfig,
    pub server: ServerConfig,
}

/// Terminal loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub tick_rate_hz: u32,
    /// Confidence reported for keyboard-injected emotions
    pub manual_confidence: f32,
    /// Fixed seed for prompt generation; random when absent
    pub seed: Option<u64>,
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            tick_rate_hz: 30,
            manual_confidence: 0.9,
            seed: None,
        }
    }
}

/// Network host settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Largest accepted request frame in bytes
    pub max_frame_bytes: usize,
    /// Landmark helper command for image analysis
    pub helper: Option<HelperCommand>,
    /// Longest wait for one helper answer before the helper is retired
    pub helper_timeout_ms: u64,
}

impl ServerConfig {
    pub fn helper_timeout(&self) -> Duration {
        Duration::from_millis(self.helper_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1:5000".to_string(),
            max_frame_bytes: 16 * 1024 * 1024,
            helper: None,
            helper_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl AppConfig {
    /// Read `path`, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Schedule to use for `profile`
    pub fn timing_for(&self, profile: Profile) -> PromptTiming {
        self.timing.unwrap_or_else(|| profile.timing())
    }
}
