//! Sensor frame model
//!
//! A frame is the list of skeleton candidates the depth sensor reported at
//! one instant. Entities are rebuilt every frame and never stored by the
//! core; only derived counts survive between frames.

pub mod input;

use serde::{Deserialize, Serialize};

pub use input::{parse_line, InputLine};

/// Tracking quality reported by the sensor for one skeleton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    /// Slot is empty
    NotTracked,
    /// Only a coarse position is known
    PositionOnly,
    /// Full joint data
    Tracked,
}

impl TrackingState {
    /// Tracked or position-only; both count towards occupancy
    pub fn has_position(self) -> bool {
        matches!(self, TrackingState::Tracked | TrackingState::PositionOnly)
    }
}

/// Position in sensor space (metres)
///
/// `z` is the forward distance from the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    pub z: f32,
}

/// One skeleton candidate in a frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackedEntity {
    pub tracking: TrackingState,
    pub position: Position,
}

impl TrackedEntity {
    pub fn new(tracking: TrackingState, position: Position) -> Self {
        Self { tracking, position }
    }

    /// Fully tracked skeleton at forward distance `z`
    pub fn tracked(z: f32) -> Self {
        Self::new(TrackingState::Tracked, Position { x: 0.0, y: 0.0, z })
    }

    /// Position-only skeleton at forward distance `z`
    pub fn position_only(z: f32) -> Self {
        Self::new(TrackingState::PositionOnly, Position { x: 0.0, y: 0.0, z })
    }

    /// Empty slot
    pub fn not_tracked() -> Self {
        Self::new(TrackingState::NotTracked, Position::default())
    }

    /// Forward distance from the sensor
    pub fn distance(&self) -> f32 {
        self.position.z
    }
}
