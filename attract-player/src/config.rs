//! Configuration management for attract-player
//!
//! Two tiers, mirroring the usual bootstrap flow:
//! 1. **TOML file**: presence and playback tuning, media paths, logging
//! 2. **Command-line / environment overrides** applied on top
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables (`ATTRACT_MEDIA`, `ATTRACT_LOG_LEVEL`, ...)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! A missing TOML file is not an error; see `attract_common::config`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use attract_common::config::{load_toml_or_default, LoggingConfig};
use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::playback::controller::ControllerSettings;
use crate::session::{SessionSettings, MAX_PLAY_DELAY_SECS};

/// Settings as written in the TOML file
///
/// Every key is optional; missing keys take the built-in defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Video to open at startup
    #[serde(default)]
    pub media_path: Option<PathBuf>,

    /// Still image shown while nobody is present
    #[serde(default)]
    pub image_path: Option<PathBuf>,

    /// Forward distance (metres) under which a skeleton counts as present
    #[serde(default = "default_range_threshold")]
    pub range_threshold: f32,

    /// Debounce window length in frames
    #[serde(default = "default_buffer_len")]
    pub buffer_len: usize,

    /// Delay between arrival and playback (whole seconds, 0-5)
    #[serde(default)]
    pub play_delay_secs: u64,

    /// Fade-out length when the last person leaves
    #[serde(default = "default_stop_fade_ms")]
    pub stop_fade_ms: u64,

    /// Volume ramp tick
    #[serde(default = "default_fade_tick_ms")]
    pub fade_tick_ms: u64,

    /// Extra wait before a stalled start is forced
    #[serde(default = "default_stall_grace_ms")]
    pub stall_grace_ms: u64,

    /// Media position at which the video surface is revealed
    #[serde(default = "default_reveal_threshold_ms")]
    pub reveal_threshold_ms: u64,

    /// How often the reveal check polls the media position
    #[serde(default = "default_reveal_poll_ms")]
    pub reveal_poll_ms: u64,

    /// Event bus buffer size
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Start with presence detection armed (demo mode on)
    #[serde(default = "default_demo_on_start")]
    pub demo_on_start: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_range_threshold() -> f32 {
    crate::presence::DEFAULT_RANGE_THRESHOLD
}

fn default_buffer_len() -> usize {
    crate::presence::DEFAULT_BUFFER_LEN
}

fn default_stop_fade_ms() -> u64 {
    2000
}

fn default_fade_tick_ms() -> u64 {
    50
}

fn default_stall_grace_ms() -> u64 {
    1500
}

fn default_reveal_threshold_ms() -> u64 {
    100
}

fn default_reveal_poll_ms() -> u64 {
    50
}

fn default_event_capacity() -> usize {
    100
}

fn default_demo_on_start() -> bool {
    true
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            media_path: None,
            image_path: None,
            range_threshold: default_range_threshold(),
            buffer_len: default_buffer_len(),
            play_delay_secs: 0,
            stop_fade_ms: default_stop_fade_ms(),
            fade_tick_ms: default_fade_tick_ms(),
            stall_grace_ms: default_stall_grace_ms(),
            reveal_threshold_ms: default_reveal_threshold_ms(),
            reveal_poll_ms: default_reveal_poll_ms(),
            event_capacity: default_event_capacity(),
            demo_on_start: default_demo_on_start(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub media_path: Option<PathBuf>,
    pub buffer_len: Option<usize>,
    pub play_delay_secs: Option<u64>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

/// Complete, validated application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub media_path: Option<PathBuf>,
    pub image_path: Option<PathBuf>,
    pub session: SessionSettings,
    pub controller: ControllerSettings,
    pub event_capacity: usize,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load the TOML file (if any), apply overrides, validate.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file cannot be read or parsed, or if a
    /// value cannot be used even after clamping.
    pub fn load(toml_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let toml_config: TomlConfig = load_toml_or_default(toml_path)?;
        Self::from_toml(toml_config, overrides)
    }

    /// Build from an already parsed TOML config
    pub fn from_toml(mut toml_config: TomlConfig, overrides: ConfigOverrides) -> Result<Self> {
        // Apply CLI overrides
        if let Some(path) = overrides.media_path {
            toml_config.media_path = Some(path);
        }
        if let Some(buffer_len) = overrides.buffer_len {
            toml_config.buffer_len = buffer_len;
        }
        if let Some(delay) = overrides.play_delay_secs {
            toml_config.play_delay_secs = delay;
        }
        if let Some(level) = overrides.log_level {
            toml_config.logging.level = level;
        }
        if let Some(file) = overrides.log_file {
            toml_config.logging.file = Some(file);
        }

        Self::validate(toml_config)
    }

    fn validate(toml: TomlConfig) -> Result<Self> {
        if !toml.range_threshold.is_finite() || toml.range_threshold <= 0.0 {
            return Err(Error::Config(format!(
                "range_threshold must be a positive distance, got {}",
                toml.range_threshold
            )));
        }
        if toml.fade_tick_ms == 0 {
            return Err(Error::Config("fade_tick_ms must be greater than 0".to_string()));
        }
        if toml.reveal_poll_ms == 0 {
            return Err(Error::Config(
                "reveal_poll_ms must be greater than 0".to_string(),
            ));
        }

        let buffer_len = if toml.buffer_len == 0 {
            warn!("buffer_len 0 is invalid, using 1");
            1
        } else {
            toml.buffer_len
        };

        let play_delay_secs = if toml.play_delay_secs > MAX_PLAY_DELAY_SECS {
            warn!(
                "play_delay_secs {} exceeds {}, clamping",
                toml.play_delay_secs, MAX_PLAY_DELAY_SECS
            );
            MAX_PLAY_DELAY_SECS
        } else {
            toml.play_delay_secs
        };

        Ok(Self {
            media_path: toml.media_path,
            image_path: toml.image_path,
            session: SessionSettings {
                range_threshold: toml.range_threshold,
                buffer_len,
                play_delay_secs,
                stop_fade: Duration::from_millis(toml.stop_fade_ms),
                stall_grace: Duration::from_millis(toml.stall_grace_ms),
                demo_on_start: toml.demo_on_start,
            },
            controller: ControllerSettings {
                fade_tick: Duration::from_millis(toml.fade_tick_ms),
                reveal_poll: Duration::from_millis(toml.reveal_poll_ms),
                reveal_threshold: Duration::from_millis(toml.reveal_threshold_ms),
            },
            event_capacity: toml.event_capacity.max(1),
            logging: toml.logging,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media_path: None,
            image_path: None,
            session: SessionSettings::default(),
            controller: ControllerSettings::default(),
            event_capacity: default_event_capacity(),
            logging: LoggingConfig::default(),
        }
    }
}
