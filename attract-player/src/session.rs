//! Session: the owning process around detector and controller
//!
//! Runs the detector on every frame while demo mode is on, maps edges to
//! controller calls, runs stall recovery, applies operator commands and turns
//! controller notices into display events.
//!
//! Edge reactions:
//! - `BecameOccupied`: start (after the play delay) unless already playing
//! - `BecameEmpty`: fade out unless already stopped or stopping
//! - `NoChange`: stall check; force a start if presence persists unplayed

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use attract_common::events::{DisplaySurface, EventBus, PlayerEvent};
use attract_common::human_time::format_duration;
use serde::Deserialize;
use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::playback::controller::{ControllerNotice, ControllerSettings, PlaybackController};
use crate::playback::media::MediaSink;
use crate::playback::stall::{StallWatch, DEFAULT_STALL_GRACE};
use crate::playback::timer::TimerHandle;
use crate::presence::{PresenceDetector, PresenceEdge, DEFAULT_BUFFER_LEN, DEFAULT_RANGE_THRESHOLD};
use crate::sensor::TrackedEntity;

/// Largest selectable start delay (seconds)
pub const MAX_PLAY_DELAY_SECS: u64 = 5;

/// Default fade-out length when the last person leaves
pub const DEFAULT_STOP_FADE: Duration = Duration::from_secs(2);

/// Presence and timing settings of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub range_threshold: f32,
    pub buffer_len: usize,
    pub play_delay_secs: u64,
    pub stop_fade: Duration,
    pub stall_grace: Duration,
    pub demo_on_start: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            range_threshold: DEFAULT_RANGE_THRESHOLD,
            buffer_len: DEFAULT_BUFFER_LEN,
            play_delay_secs: 0,
            stop_fade: DEFAULT_STOP_FADE,
            stall_grace: DEFAULT_STALL_GRACE,
            demo_on_start: true,
        }
    }
}

/// Operator commands
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionCommand {
    /// Arm or disarm presence-triggered playback
    ToggleDemo,
    /// Forget debounce samples (sensor reset)
    ResetDetection,
    /// Show or hide the debug overlay
    ToggleDebug,
    /// Start delay in whole seconds (0-5)
    SetPlayDelay(u64),
    /// Debounce window +1 (outside demo mode only)
    LengthenBuffer,
    /// Debounce window -1, never below 1 (outside demo mode only)
    ShortenBuffer,
    /// Replace the video and play it at once
    OpenMedia(PathBuf),
    /// Replace the still image and show it
    OpenImage(PathBuf),
    /// Explicit immediate start
    Start,
    /// Explicit hard stop
    Stop,
}

/// Detector + controller + operator state
pub struct Session<M: MediaSink> {
    detector: PresenceDetector,
    controller: PlaybackController<M>,
    stall: StallWatch,
    events: EventBus,
    play_delay_secs: u64,
    stop_fade: Duration,
    demo_mode: bool,
    show_debug: bool,
    surface: DisplaySurface,
    image_path: Option<PathBuf>,
}

impl<M: MediaSink> Session<M> {
    pub fn new(
        media: M,
        events: EventBus,
        settings: SessionSettings,
        controller_settings: ControllerSettings,
    ) -> Self {
        let play_delay_secs = settings.play_delay_secs.min(MAX_PLAY_DELAY_SECS);
        Self {
            detector: PresenceDetector::new(settings.range_threshold, settings.buffer_len),
            controller: PlaybackController::new(media, events.clone(), controller_settings),
            stall: StallWatch::new(settings.stall_grace),
            events,
            play_delay_secs,
            stop_fade: settings.stop_fade,
            demo_mode: settings.demo_on_start,
            show_debug: !settings.demo_on_start,
            surface: DisplaySurface::Image,
            image_path: None,
        }
    }

    /// Process one sensor frame.
    ///
    /// Frames are ignored (and reported as `NoChange`) outside demo mode.
    pub fn on_frame(&mut self, entities: &[TrackedEntity], now: Instant) -> PresenceEdge {
        if !self.demo_mode {
            trace!("frame ignored: demo mode off");
            return PresenceEdge::NoChange;
        }

        let edge = self.detector.update(entities);
        match edge {
            PresenceEdge::BecameOccupied => {
                info!("status: {}", edge);
                self.emit_presence(true);

                if !self.controller.is_playing() {
                    info!("player starting..");
                    self.events.emit_lossy(PlayerEvent::OpacityReset);
                    let notice = self.controller.start_with_delay(self.play_delay(), now);
                    self.handle_notice(notice);
                }
            }
            PresenceEdge::BecameEmpty => {
                info!("status: {}", edge);
                self.emit_presence(false);

                if self.controller.is_playing() && !self.controller.is_stopping() {
                    info!("player stopping..");
                    self.events.emit_lossy(PlayerEvent::OpacityReset);
                    let notice = self.controller.stop_with_fade(self.stop_fade, now);
                    self.handle_notice(notice);
                }
            }
            // Without a source a forced start is a no-op; stay silent
            PresenceEdge::NoChange if !self.controller.media().has_source() => {}
            PresenceEdge::NoChange => {
                let present = self.detector.count() > 0;
                let playing = self.controller.is_playing();
                if let Some(waited) = self.stall.observe(present, playing, self.play_delay(), now) {
                    info!(
                        "status: 1->1, but video not played (waited {})",
                        format_duration(waited)
                    );
                    self.events.emit_lossy(PlayerEvent::StallRecovered {
                        waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                        timestamp: chrono::Utc::now(),
                    });
                    self.events.emit_lossy(PlayerEvent::OpacityReset);
                    let notice = self.controller.start_with_delay(self.play_delay(), now);
                    self.handle_notice(notice);
                }
            }
        }

        if self.show_debug {
            self.events.emit_lossy(PlayerEvent::DebugInfo {
                text: self.detector.debug_info().to_string(),
            });
        }

        edge
    }

    /// Apply an operator command.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` for a play delay above the maximum
    /// - `Error::Media` when a media or image file cannot be opened
    pub fn apply(&mut self, command: SessionCommand, now: Instant) -> Result<()> {
        debug!("command: {:?}", command);
        match command {
            SessionCommand::ToggleDemo => {
                let enabled = !self.demo_mode;
                self.set_demo_mode(enabled);
                if enabled {
                    self.controller.stop();
                    self.stall.reset();
                    self.set_surface(DisplaySurface::Image);
                    self.set_show_debug(false);
                } else {
                    self.set_show_debug(true);
                }
            }
            SessionCommand::ResetDetection => {
                info!("detection reset");
                self.detector.clear();
            }
            SessionCommand::ToggleDebug => {
                let visible = !self.show_debug;
                self.set_show_debug(visible);
            }
            SessionCommand::SetPlayDelay(secs) => {
                if secs > MAX_PLAY_DELAY_SECS {
                    return Err(Error::InvalidInput(format!(
                        "play delay {}s out of range 0-{}",
                        secs, MAX_PLAY_DELAY_SECS
                    )));
                }
                self.play_delay_secs = secs;
                info!("play delay set to {}s", secs);
                self.events
                    .emit_lossy(PlayerEvent::PlayDelayChanged { delay_secs: secs });
            }
            SessionCommand::LengthenBuffer => {
                if self.demo_mode {
                    debug!("buffer length locked in demo mode");
                    return Ok(());
                }
                self.set_buffer_len(self.detector.buffer_len() + 1);
            }
            SessionCommand::ShortenBuffer => {
                if self.demo_mode {
                    debug!("buffer length locked in demo mode");
                    return Ok(());
                }
                if self.detector.buffer_len() > 1 {
                    self.set_buffer_len(self.detector.buffer_len() - 1);
                }
            }
            SessionCommand::OpenMedia(path) => {
                self.open_media(&path)?;
                let notice = self.controller.start(now);
                self.handle_notice(notice);
                self.set_demo_mode(false);
                self.set_surface(DisplaySurface::Video);
            }
            SessionCommand::OpenImage(path) => {
                if !path.is_file() {
                    return Err(Error::Media(format!(
                        "Image file not found: {}",
                        path.display()
                    )));
                }
                info!("image set: {}", path.display());
                self.image_path = Some(path);
                self.set_demo_mode(false);
                self.set_surface(DisplaySurface::Image);
            }
            SessionCommand::Start => {
                let notice = self.controller.start(now);
                self.handle_notice(notice);
            }
            SessionCommand::Stop => {
                self.controller.stop();
            }
        }
        Ok(())
    }

    /// Load a video source without starting it
    pub fn open_media(&mut self, path: &Path) -> Result<()> {
        self.controller.media_mut().open(path)?;
        self.on_media_opened(path);
        Ok(())
    }

    /// Set the still image path without changing modes
    pub fn set_image(&mut self, path: PathBuf) {
        self.image_path = Some(path);
    }

    /// Media engine finished opening a source
    pub fn on_media_opened(&mut self, path: &Path) {
        info!("media opened");
        self.events.emit_lossy(PlayerEvent::MediaOpened {
            path: path.display().to_string(),
        });
    }

    /// Media engine reached the end of its source
    pub fn on_media_ended(&mut self) {
        info!("media ended");
        self.events.emit_lossy(PlayerEvent::MediaEnded);
    }

    /// Earliest armed controller timer
    pub fn next_timer(&self) -> Option<TimerHandle> {
        self.controller.next_timer()
    }

    /// Deliver a due timer to the controller
    pub fn fire(&mut self, handle: TimerHandle, now: Instant) {
        let notice = self.controller.fire(handle, now);
        self.handle_notice(notice);
    }

    /// Hard stop before exit
    pub fn shutdown(&mut self) {
        info!("session shutdown");
        self.controller.stop();
    }

    pub fn detector(&self) -> &PresenceDetector {
        &self.detector
    }

    pub fn controller(&self) -> &PlaybackController<M> {
        &self.controller
    }

    pub fn demo_mode(&self) -> bool {
        self.demo_mode
    }

    pub fn show_debug(&self) -> bool {
        self.show_debug
    }

    pub fn play_delay(&self) -> Duration {
        Duration::from_secs(self.play_delay_secs)
    }

    pub fn surface(&self) -> DisplaySurface {
        self.surface
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn handle_notice(&mut self, notice: Option<ControllerNotice>) {
        match notice {
            Some(ControllerNotice::Started) => info!("on video played"),
            Some(ControllerNotice::Stopped) => {
                info!("on video stopped");
                self.set_surface(DisplaySurface::Image);
            }
            Some(ControllerNotice::Revealed) => self.set_surface(DisplaySurface::Video),
            None => {}
        }
    }

    fn emit_presence(&self, occupied: bool) {
        self.events.emit_lossy(PlayerEvent::PresenceChanged {
            occupied,
            count: self.detector.count(),
            timestamp: chrono::Utc::now(),
        });
    }

    fn set_buffer_len(&mut self, buffer_len: usize) {
        self.detector.configure_buffer_length(buffer_len);
        info!("bufLen={}", self.detector.buffer_len());
        self.events.emit_lossy(PlayerEvent::BufferLengthChanged {
            buffer_len: self.detector.buffer_len(),
        });
    }

    fn set_demo_mode(&mut self, enabled: bool) {
        if self.demo_mode != enabled {
            self.demo_mode = enabled;
            info!("demo mode {}", if enabled { "on" } else { "off" });
            self.events
                .emit_lossy(PlayerEvent::DemoModeChanged { enabled });
        }
    }

    fn set_show_debug(&mut self, visible: bool) {
        if self.show_debug != visible {
            self.show_debug = visible;
            self.events
                .emit_lossy(PlayerEvent::DebugVisibilityChanged { visible });
        }
    }

    fn set_surface(&mut self, surface: DisplaySurface) {
        if self.surface != surface {
            self.surface = surface;
            match (surface, &self.image_path) {
                (DisplaySurface::Image, Some(path)) => {
                    debug!("surface: {} ({})", surface, path.display())
                }
                _ => debug!("surface: {}", surface),
            }
            self.events.emit_lossy(PlayerEvent::SurfaceChanged { surface });
        }
    }
}
