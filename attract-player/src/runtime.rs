//! Event loop
//!
//! One task multiplexes three sources with `tokio::select!`:
//! - the shutdown future
//! - the earliest armed controller timer
//! - JSON input lines (frames, operator commands, media notifications)
//!
//! Because everything runs on this task, the session needs no locking. Clock
//! readings come from `tokio::time` so paused-time tests drive the timers.

use std::future::Future;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::playback::media::MediaSink;
use crate::playback::timer::TimerHandle;
use crate::sensor::{parse_line, InputLine};
use crate::session::Session;

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    EndOfInput,
    Shutdown,
}

/// Counters reported when the loop ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub exit: ExitReason,
    pub frames: u64,
    pub commands: u64,
    /// Lines that failed to parse or commands that were refused
    pub rejected: u64,
}

/// Run the session until end of input or shutdown.
///
/// The session is hard-stopped before returning either way.
///
/// # Errors
///
/// Returns `Error::Io` if reading the input fails. Malformed lines are
/// logged and skipped.
pub async fn run<M, R, F>(session: &mut Session<M>, input: R, shutdown: F) -> Result<RunSummary>
where
    M: MediaSink,
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut lines = input.lines();
    let mut summary = RunSummary {
        exit: ExitReason::EndOfInput,
        frames: 0,
        commands: 0,
        rejected: 0,
    };

    info!("Event loop started");

    loop {
        let next = session.next_timer();

        tokio::select! {
            biased;

            _ = &mut shutdown => {
                summary.exit = ExitReason::Shutdown;
                break;
            }

            handle = timer_due(next) => {
                let now = now();
                if handle.is_due(now) {
                    session.fire(handle, now);
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("End of input");
                    break;
                };
                handle_line(session, &line, &mut summary);
            }
        }
    }

    session.shutdown();
    info!(
        "Event loop stopped ({:?}): {} frames, {} commands, {} rejected",
        summary.exit, summary.frames, summary.commands, summary.rejected
    );
    Ok(summary)
}

fn handle_line<M: MediaSink>(session: &mut Session<M>, line: &str, summary: &mut RunSummary) {
    let parsed = match parse_line(line) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => return,
        Err(e) => {
            warn!("Skipping invalid input line: {}", e);
            summary.rejected += 1;
            return;
        }
    };

    match parsed {
        InputLine::Frame(entities) => {
            summary.frames += 1;
            let edge = session.on_frame(&entities, now());
            debug!("frame {}: {} entities, {}", summary.frames, entities.len(), edge);
        }
        InputLine::Command(command) => {
            summary.commands += 1;
            if let Err(e) = session.apply(command, now()) {
                warn!("Command rejected: {}", e);
                summary.rejected += 1;
            }
        }
        InputLine::MediaEnded => session.on_media_ended(),
    }
}

/// Resolves once `timer` is due; never resolves for `None`
async fn timer_due(timer: Option<TimerHandle>) -> TimerHandle {
    match timer {
        Some(handle) => {
            sleep_until(Instant::from_std(handle.deadline)).await;
            handle
        }
        None => std::future::pending().await,
    }
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}
