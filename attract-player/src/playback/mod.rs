//! Playback: controller state machine, its timers, and the media collaborator

pub mod controller;
pub mod media;
pub mod ramp;
pub mod stall;
pub mod timer;

pub use controller::{ControllerNotice, ControllerSettings, PlaybackController};
pub use media::{HeadlessMedia, MediaSink};
pub use ramp::VolumeRamp;
pub use stall::StallWatch;
pub use timer::{TimerHandle, TimerKind};
