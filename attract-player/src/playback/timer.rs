//! Cancellable timer handles
//!
//! The controller never sleeps itself. It stores one handle per armed timer
//! and hands the earliest one to the runtime loop, which sleeps until the
//! deadline and passes the handle back. Every transition bumps the
//! controller's generation, so a handle captured before a transition no
//! longer matches any armed slot and its fire is ignored.

use std::time::{Duration, Instant};

/// What an armed timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// One-shot: begin playback after the start delay
    StartDelay,
    /// Repeating: lower the volume by one step
    FadeTick,
    /// Repeating: check whether the media has advanced far enough to show
    RevealPoll,
}

impl std::fmt::Display for TimerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerKind::StartDelay => write!(f, "start-delay"),
            TimerKind::FadeTick => write!(f, "fade-tick"),
            TimerKind::RevealPoll => write!(f, "reveal-poll"),
        }
    }
}

/// Identity of one armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    pub kind: TimerKind,
    /// Controller generation at arm time
    pub generation: u64,
    pub deadline: Instant,
}

impl TimerHandle {
    pub fn new(kind: TimerKind, generation: u64, deadline: Instant) -> Self {
        Self {
            kind,
            generation,
            deadline,
        }
    }

    /// Same timer, next period
    pub fn rearmed(self, interval: Duration) -> Self {
        Self {
            deadline: self.deadline + interval,
            ..self
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// Earliest of a set of optional handles
pub fn earliest<I>(handles: I) -> Option<TimerHandle>
where
    I: IntoIterator<Item = Option<TimerHandle>>,
{
    handles.into_iter().flatten().min_by_key(|h| h.deadline)
}
