//! JSON-lines input from the sensor collaborator
//!
//! Each line is one of:
//! - `{"frame": [<entity>, ...]}`: one sensor frame
//! - `{"command": <command>}`: an operator command
//! - `"media_ended"`: the media engine reached the end of the source
//!
//! Blank lines and lines starting with `#` are ignored.

use serde::Deserialize;

use super::TrackedEntity;
use crate::error::Result;
use crate::session::SessionCommand;

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputLine {
    Frame(Vec<TrackedEntity>),
    Command(SessionCommand),
    MediaEnded,
}

/// Parse one input line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<InputLine>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(trimmed)?))
}
