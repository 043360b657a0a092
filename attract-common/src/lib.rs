//! # Attract Common Library
//!
//! Shared code for the Attract presence-triggered player:
//! - Error type
//! - Event types (PlayerEvent enum) and the EventBus
//! - Configuration file discovery
//! - Human-readable duration formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
