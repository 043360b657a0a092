//! Playback-related type definitions
//!
//! Supporting types for controller state and display surfaces.

use serde::{Deserialize, Serialize};

/// Playback controller phase as seen from outside the controller
///
/// `is_playing` is true in every state except `Idle`; `is_stopping` only
/// in `Stopping`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Not playing, not stopping
    Idle,
    /// Start committed, delay timer armed
    PendingStart,
    /// Media engine playing at full volume
    Playing,
    /// Volume ramping down towards a hard stop
    Stopping,
}

impl PlaybackState {
    pub fn is_playing(self) -> bool {
        !matches!(self, PlaybackState::Idle)
    }

    pub fn is_stopping(self) -> bool {
        matches!(self, PlaybackState::Stopping)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::PendingStart => write!(f, "pending_start"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Stopping => write!(f, "stopping"),
        }
    }
}

/// Which full-screen surface the display should show
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DisplaySurface {
    /// Video area visible, still image collapsed
    Video,
    /// Still image visible, video area collapsed
    Image,
}

impl std::fmt::Display for DisplaySurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplaySurface::Video => write!(f, "video"),
            DisplaySurface::Image => write!(f, "image"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playing_flags() {
        assert!(!PlaybackState::Idle.is_playing());
        assert!(PlaybackState::PendingStart.is_playing());
        assert!(PlaybackState::Playing.is_playing());
        assert!(PlaybackState::Stopping.is_playing());

        assert!(PlaybackState::Stopping.is_stopping());
        assert!(!PlaybackState::Playing.is_stopping());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&PlaybackState::PendingStart).unwrap();
        assert_eq!(json, "\"pending_start\"");

        let surface: DisplaySurface = serde_json::from_str("\"image\"").unwrap();
        assert_eq!(surface, DisplaySurface::Image);
    }
}
