//! Debounced presence detector
//!
//! Converts per-frame skeleton data into an edge-triggered occupancy signal.
//!
//! # Debounce
//!
//! Each update pushes one binary sample (anyone in range this frame?) into a
//! bounded FIFO. The debounced status is "any sample in the window is 1", so
//! occupancy is reported on the first positive frame and released only after
//! `buffer_len` consecutive empty frames. A single dropped frame never flaps
//! playback.
//!
//! # Edges
//!
//! Only flips of the debounced status are reported. While someone stands
//! still the detector keeps returning `NoChange`, so the caller is not
//! re-invoked every frame.

use std::collections::VecDeque;

use crate::sensor::{TrackedEntity, TrackingState};

/// Forward distance (metres) under which a skeleton counts as present
pub const DEFAULT_RANGE_THRESHOLD: f32 = 3.0;

/// Default debounce window length (frames)
pub const DEFAULT_BUFFER_LEN: usize = 3;

/// Transition of the debounced occupancy status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEdge {
    /// Status flipped empty → occupied
    BecameOccupied,
    /// Status flipped occupied → empty
    BecameEmpty,
    /// Status unchanged
    NoChange,
}

impl std::fmt::Display for PresenceEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresenceEdge::BecameOccupied => write!(f, "0->1"),
            PresenceEdge::BecameEmpty => write!(f, "1->0"),
            PresenceEdge::NoChange => write!(f, "no change"),
        }
    }
}

/// Sliding-window presence detector
#[derive(Debug, Clone)]
pub struct PresenceDetector {
    /// Range threshold on forward distance
    threshold: f32,

    /// Window capacity (always >= 1)
    buffer_len: usize,

    /// Recent binary samples, oldest first
    samples: VecDeque<u8>,

    /// Raw in-range count from the latest frame
    last_count: usize,

    /// Debounced status after the latest update
    last_status: bool,

    /// Raw count rendered for an external debug overlay
    debug_info: String,
}

impl PresenceDetector {
    /// Create a detector with the given range threshold and window length.
    ///
    /// A window length of 0 is clamped to 1.
    pub fn new(threshold: f32, buffer_len: usize) -> Self {
        let buffer_len = buffer_len.max(1);
        Self {
            threshold,
            buffer_len,
            samples: VecDeque::with_capacity(buffer_len + 1),
            last_count: 0,
            last_status: false,
            debug_info: String::new(),
        }
    }

    /// Change the debounce window length and forget past samples.
    ///
    /// The debounced status is kept; only future smoothing changes.
    pub fn configure_buffer_length(&mut self, buffer_len: usize) {
        self.buffer_len = buffer_len.max(1);
        self.samples.clear();
    }

    /// Feed one frame and report the debounced edge.
    pub fn update(&mut self, entities: &[TrackedEntity]) -> PresenceEdge {
        let count = self.count_in_range(entities);
        self.last_count = count;
        self.debug_info = count.to_string();

        self.samples.push_back(u8::from(count > 0));
        while self.samples.len() > self.buffer_len {
            self.samples.pop_front();
        }

        let status = self.samples.iter().any(|&s| s > 0);
        let edge = match (self.last_status, status) {
            (false, true) => PresenceEdge::BecameOccupied,
            (true, false) => PresenceEdge::BecameEmpty,
            _ => PresenceEdge::NoChange,
        };
        self.last_status = status;
        edge
    }

    /// Raw (unsmoothed) in-range count from the latest frame
    pub fn count(&self) -> usize {
        self.last_count
    }

    /// Forget past samples; status and count are kept.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Closest fully tracked skeleton within range.
    ///
    /// Position-only skeletons are ignored. On equal distances the first one
    /// in frame order wins.
    pub fn nearest_entity<'a>(&self, entities: &'a [TrackedEntity]) -> Option<&'a TrackedEntity> {
        let mut nearest: Option<&'a TrackedEntity> = None;
        for entity in entities {
            if entity.tracking != TrackingState::Tracked || entity.distance() >= self.threshold {
                continue;
            }
            match nearest {
                Some(best) if entity.distance() >= best.distance() => {}
                _ => nearest = Some(entity),
            }
        }
        nearest
    }

    /// Debounced status after the latest update
    pub fn status(&self) -> bool {
        self.last_status
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Number of samples currently in the window
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Human-readable debug text (the raw count)
    pub fn debug_info(&self) -> &str {
        &self.debug_info
    }

    fn count_in_range(&self, entities: &[TrackedEntity]) -> usize {
        entities
            .iter()
            .filter(|e| e.tracking.has_position() && e.distance() < self.threshold)
            .count()
    }
}

impl Default for PresenceDetector {
    fn default() -> Self {
        Self::new(DEFAULT_RANGE_THRESHOLD, DEFAULT_BUFFER_LEN)
    }
}
