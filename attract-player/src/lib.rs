//! # Attract Player Library (attract-player)
//!
//! Presence-triggered media playback.
//!
//! **Purpose:** Turn per-frame skeleton tracking data into a debounced
//! occupancy signal, and drive a media engine from it: delayed start,
//! fade-to-silence stop, and a forced restart when presence persists without
//! playback.
//!
//! **Architecture:** Everything runs on one task. The sensor collaborator
//! feeds frames, the controller exposes its armed timers as deadlines, and
//! the runtime loop multiplexes both with `tokio::select!`.

pub mod config;
pub mod error;
pub mod playback;
pub mod presence;
pub mod runtime;
pub mod sensor;
pub mod session;

pub use error::{Error, Result};
pub use session::{Session, SessionCommand};
