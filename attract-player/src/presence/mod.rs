//! Presence detection: raw skeleton frames to a debounced occupancy edge

pub mod detector;

pub use detector::{PresenceDetector, PresenceEdge, DEFAULT_BUFFER_LEN, DEFAULT_RANGE_THRESHOLD};
