//! Test helpers for attract-player integration tests
//!
//! - `Script`: timed input lines fed to the runtime through an in-memory pipe
//! - `drain`: collect everything published on the event bus so far

#![allow(dead_code)]

use std::time::Duration;

use attract_common::events::{EventBus, PlayerEvent};
use attract_player::playback::{ControllerSettings, HeadlessMedia};
use attract_player::runtime::{self, RunSummary};
use attract_player::session::{Session, SessionSettings};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::broadcast;

/// Session over a headless engine that already has a source
pub fn test_session(settings: SessionSettings) -> Session<HeadlessMedia> {
    Session::new(
        HeadlessMedia::with_source("attract.mp4"),
        EventBus::new(4096),
        settings,
        ControllerSettings::default(),
    )
}

/// One frame with a tracked skeleton at `z` metres
pub fn person_at(z: f32) -> String {
    format!(
        r#"{{"frame":[{{"tracking":"tracked","position":{{"x":0.0,"y":0.0,"z":{}}}}}]}}"#,
        z
    )
}

/// One frame with nobody in view
pub fn empty_frame() -> String {
    r#"{"frame":[]}"#.to_string()
}

pub fn command(json: &str) -> String {
    format!(r#"{{"command":{}}}"#, json)
}

/// Input lines, each written after a delay
#[derive(Debug, Default)]
pub struct Script {
    steps: Vec<(Duration, String)>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `line` after `delay`
    pub fn after(mut self, delay: Duration, line: impl Into<String>) -> Self {
        self.steps.push((delay, line.into()));
        self
    }

    /// `count` copies of `line`, one every `interval`
    pub fn repeat(mut self, count: usize, interval: Duration, line: &str) -> Self {
        for _ in 0..count {
            self.steps.push((interval, line.to_string()));
        }
        self
    }

    /// Let `delay` pass with no input (timers keep running)
    pub fn idle(self, delay: Duration) -> Self {
        self.after(delay, "# idle")
    }

    /// Total scripted time
    pub fn duration(&self) -> Duration {
        self.steps.iter().map(|(delay, _)| *delay).sum()
    }

    /// Run `session` against this script; input ends after the last line
    pub async fn play(self, session: &mut Session<HeadlessMedia>) -> RunSummary {
        let (mut writer, reader) = tokio::io::duplex(64 * 1024);

        let feeder = async move {
            for (delay, line) in self.steps {
                tokio::time::sleep(delay).await;
                writer.write_all(line.as_bytes()).await.unwrap();
                writer.write_all(b"\n").await.unwrap();
            }
            // Dropping the writer ends the input
        };

        let (summary, ()) = tokio::join!(
            runtime::run(session, BufReader::new(reader), std::future::pending()),
            feeder
        );
        summary.expect("runtime failed")
    }
}

/// Everything currently queued on `rx`
pub fn drain(rx: &mut broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Index of the first event matching `pred`
pub fn position_of(events: &[PlayerEvent], pred: impl Fn(&PlayerEvent) -> bool) -> Option<usize> {
    events.iter().position(pred)
}

pub fn count_of(events: &[PlayerEvent], pred: impl Fn(&PlayerEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}
