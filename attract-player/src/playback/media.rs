//! Media playback collaborator
//!
//! The controller only issues commands; decoding and rendering live behind
//! [`MediaSink`]. [`HeadlessMedia`] is the implementation used by the binary
//! and the tests: it keeps the command state and a simulated playback clock
//! so the reveal poll has a position to look at.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Commands the controller sends to the media engine
pub trait MediaSink {
    /// Load a new source; replaces any previous one
    fn open(&mut self, path: &Path) -> Result<()>;

    /// True once a source has been opened
    fn has_source(&self) -> bool;

    fn play(&mut self);

    fn stop(&mut self);

    /// Volume in `0.0..=1.0`
    fn set_volume(&mut self, volume: f64);

    fn set_position(&mut self, position: Duration);

    fn set_speed_ratio(&mut self, ratio: f64);

    /// Current playback position
    fn position(&self) -> Duration;
}

/// Media engine without decoding
///
/// Tracks source, volume and a playback position that advances with the
/// tokio clock while playing (so paused-time tests see it move).
#[derive(Debug, Clone)]
pub struct HeadlessMedia {
    source: Option<PathBuf>,
    volume: f64,
    speed_ratio: f64,
    /// Position when playback last started or was seeked
    base_position: Duration,
    /// Set while playing
    playing_since: Option<Instant>,
    play_count: u32,
    stop_count: u32,
}

impl HeadlessMedia {
    /// Engine with no source; `open` must be called before playback works
    pub fn new() -> Self {
        Self {
            source: None,
            volume: 1.0,
            speed_ratio: 1.0,
            base_position: Duration::ZERO,
            playing_since: None,
            play_count: 0,
            stop_count: 0,
        }
    }

    /// Engine with a source set, without touching the filesystem
    pub fn with_source(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(path.into()),
            ..Self::new()
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Number of `play()` calls so far
    pub fn play_count(&self) -> u32 {
        self.play_count
    }

    /// Number of `stop()` calls so far
    pub fn stop_count(&self) -> u32 {
        self.stop_count
    }
}

impl Default for HeadlessMedia {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSink for HeadlessMedia {
    fn open(&mut self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(Error::Media(format!("Media file not found: {}", path.display())));
        }
        info!("media open: {}", path.display());
        self.source = Some(path.to_path_buf());
        self.playing_since = None;
        self.base_position = Duration::ZERO;
        Ok(())
    }

    fn has_source(&self) -> bool {
        self.source.is_some()
    }

    fn play(&mut self) {
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
        self.play_count += 1;
        info!("player.play()");
    }

    fn stop(&mut self) {
        self.playing_since = None;
        self.base_position = Duration::ZERO;
        self.stop_count += 1;
        info!("player.stop()");
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn set_position(&mut self, position: Duration) {
        self.base_position = position;
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
        debug!("media position set to {:?}", position);
    }

    fn set_speed_ratio(&mut self, ratio: f64) {
        self.speed_ratio = ratio;
    }

    fn position(&self) -> Duration {
        match self.playing_since {
            Some(since) => self.base_position + since.elapsed().mul_f64(self.speed_ratio),
            None => self.base_position,
        }
    }
}
