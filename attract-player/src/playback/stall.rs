//! Stall recovery
//!
//! If a fade-out completes while someone is still standing in front of the
//! sensor (they walked out and straight back in during the fade), no new
//! occupied edge arrives and playback would stay paused for good. The watch
//! notices "someone present, nothing playing" persisting past the start
//! delay plus a grace period and asks for a forced start.

use std::time::{Duration, Instant};

/// Extra wait on top of the start delay before forcing a start
pub const DEFAULT_STALL_GRACE: Duration = Duration::from_millis(1500);

/// Tracks one stall episode at a time
#[derive(Debug, Clone)]
pub struct StallWatch {
    grace: Duration,
    /// When the current episode was first observed
    since: Option<Instant>,
    /// Recovery already requested for the current episode
    fired: bool,
}

impl StallWatch {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            since: None,
            fired: false,
        }
    }

    /// Time a stall must persist before recovery, for a given start delay
    pub fn threshold(&self, play_delay: Duration) -> Duration {
        play_delay + self.grace
    }

    /// Observe one frame without an edge.
    ///
    /// Returns how long the stall lasted when a forced start is due. An
    /// episode lasts until someone leaves or playback is seen, and yields at
    /// most one recovery even if the forced start does not take.
    pub fn observe(
        &mut self,
        present: bool,
        playing: bool,
        play_delay: Duration,
        now: Instant,
    ) -> Option<Duration> {
        if !present || playing {
            self.reset();
            return None;
        }
        if self.fired {
            return None;
        }

        let Some(since) = self.since else {
            self.since = Some(now);
            return None;
        };

        let waited = now.saturating_duration_since(since);
        if waited > self.threshold(play_delay) {
            self.since = None;
            self.fired = true;
            return Some(waited);
        }
        None
    }

    /// Drop any episode in progress
    pub fn reset(&mut self) {
        self.since = None;
        self.fired = false;
    }

    pub fn since(&self) -> Option<Instant> {
        self.since
    }
}

impl Default for StallWatch {
    fn default() -> Self {
        Self::new(DEFAULT_STALL_GRACE)
    }
}
