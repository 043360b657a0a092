//! Timer-driven playback state machine
//!
//! # Phases
//!
//! ```text
//!            start(delay>0)             delay elapsed
//!   Idle ─────────────────▶ PendingStart ─────────────▶ Playing
//!    ▲  └──────────── start(0) ───────────────────────────▲ │
//!    │                                                      │ stop_with_fade(len)
//!    │            volume reaches 0 (hard stop)              ▼
//!    └──────────────────────────────────────────────── Stopping
//! ```
//!
//! `stop()` returns to `Idle` from any phase. Every transition bumps the
//! generation counter, which invalidates all previously armed timer handles:
//! a start delay that fires after a stop, or a fade tick that fires after a
//! new start, is ignored.
//!
//! # Timers
//!
//! The controller does not sleep. [`PlaybackController::next_timer`] reports
//! the earliest armed deadline and the owner calls
//! [`PlaybackController::fire`] with that handle once it is due.

use std::time::{Duration, Instant};

use attract_common::events::{EventBus, PlaybackState, PlayerEvent};
use attract_common::human_time::format_duration;
use tracing::{debug, info};

use super::media::MediaSink;
use super::ramp::VolumeRamp;
use super::timer::{earliest, TimerHandle, TimerKind};

/// Fade tick interval
pub const DEFAULT_FADE_TICK: Duration = Duration::from_millis(50);

/// Reveal poll interval
pub const DEFAULT_REVEAL_POLL: Duration = Duration::from_millis(50);

/// Media position after which the video surface is shown (avoids a blank frame)
pub const DEFAULT_REVEAL_THRESHOLD: Duration = Duration::from_millis(100);

/// Timing parameters of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub fade_tick: Duration,
    pub reveal_poll: Duration,
    pub reveal_threshold: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            fade_tick: DEFAULT_FADE_TICK,
            reveal_poll: DEFAULT_REVEAL_POLL,
            reveal_threshold: DEFAULT_REVEAL_THRESHOLD,
        }
    }
}

/// Something the owner should react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerNotice {
    /// Media engine was told to play
    Started,
    /// Fade completed and the media engine was stopped
    Stopped,
    /// Media advanced past the reveal threshold; show the video surface
    Revealed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    PendingStart { timer: TimerHandle },
    Playing,
    Stopping { timer: TimerHandle, ramp: VolumeRamp },
}

impl Phase {
    fn state(&self) -> PlaybackState {
        match self {
            Phase::Idle => PlaybackState::Idle,
            Phase::PendingStart { .. } => PlaybackState::PendingStart,
            Phase::Playing => PlaybackState::Playing,
            Phase::Stopping { .. } => PlaybackState::Stopping,
        }
    }
}

/// Playback controller
///
/// Exclusively owns the media handle. Mutated only by its public entry
/// points and by [`fire`](Self::fire).
pub struct PlaybackController<M: MediaSink> {
    media: M,
    events: EventBus,
    settings: ControllerSettings,
    phase: Phase,
    volume: f64,
    /// Armed while waiting for the media position to pass the threshold
    reveal: Option<TimerHandle>,
    generation: u64,
}

impl<M: MediaSink> PlaybackController<M> {
    pub fn new(media: M, events: EventBus, settings: ControllerSettings) -> Self {
        Self {
            media,
            events,
            settings,
            phase: Phase::Idle,
            volume: 1.0,
            reveal: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.phase.state()
    }

    /// True from a committed start until a stop completes
    pub fn is_playing(&self) -> bool {
        self.state().is_playing()
    }

    /// True only while fading to silence
    pub fn is_stopping(&self) -> bool {
        self.state().is_stopping()
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    /// Start immediately, bypassing the delay timer.
    pub fn start(&mut self, now: Instant) -> Option<ControllerNotice> {
        self.start_with_delay(Duration::ZERO, now)
    }

    /// Commit a start; the media plays once `delay` has elapsed.
    ///
    /// Rewinds the media and restores full volume. Cancels any fade in
    /// progress. No-op without a media source. Callers filter re-entrant
    /// starts while already playing.
    pub fn start_with_delay(&mut self, delay: Duration, now: Instant) -> Option<ControllerNotice> {
        if !self.media.has_source() {
            debug!("Start ignored: no media source");
            return None;
        }

        info!("Start (delay {})", format_duration(delay));

        self.media.set_speed_ratio(1.0);
        self.apply_volume(1.0);
        self.media.set_position(Duration::ZERO);

        let generation = self.next_generation();
        self.reveal = None;

        if delay.is_zero() {
            return Some(self.begin_playback(now));
        }

        let timer = TimerHandle::new(TimerKind::StartDelay, generation, now + delay);
        self.set_phase(Phase::PendingStart { timer });
        None
    }

    /// Hard stop: halt the media and cancel every timer.
    ///
    /// No-op without a media source.
    pub fn stop(&mut self) {
        if !self.media.has_source() {
            debug!("Stop ignored: no media source");
            return;
        }

        info!("Stop");
        self.media.stop();
        self.next_generation();
        self.reveal = None;
        self.set_phase(Phase::Idle);
    }

    /// Fade to silence over `len`, then hard stop.
    ///
    /// Cancels a pending start. A zero `len` stops at once. No-op without a
    /// media source or when idle.
    pub fn stop_with_fade(&mut self, len: Duration, now: Instant) -> Option<ControllerNotice> {
        if !self.media.has_source() {
            debug!("Stop({}) ignored: no media source", format_duration(len));
            return None;
        }
        if !self.is_playing() {
            debug!("Stop({}) ignored: not playing", format_duration(len));
            return None;
        }

        info!("Stop({})", format_duration(len));

        let Some(ramp) = VolumeRamp::new(len, self.settings.fade_tick) else {
            return Some(self.finish_stop());
        };

        let generation = self.next_generation();
        let timer = TimerHandle::new(
            TimerKind::FadeTick,
            generation,
            now + self.settings.fade_tick,
        );
        debug!(
            "fade: {} ticks, decrement {:.4}",
            ramp.total_ticks(),
            ramp.decrement()
        );
        self.set_phase(Phase::Stopping { timer, ramp });
        None
    }

    /// Earliest armed timer, if any
    pub fn next_timer(&self) -> Option<TimerHandle> {
        let phase_timer = match self.phase {
            Phase::PendingStart { timer } | Phase::Stopping { timer, .. } => Some(timer),
            Phase::Idle | Phase::Playing => None,
        };
        earliest([phase_timer, self.reveal])
    }

    /// Run the callback of a due timer.
    ///
    /// Handles that no longer match an armed slot (cancelled or superseded)
    /// are ignored.
    pub fn fire(&mut self, handle: TimerHandle, now: Instant) -> Option<ControllerNotice> {
        let phase = self.phase;
        let reveal = self.reveal;
        match handle.kind {
            TimerKind::StartDelay => match phase {
                Phase::PendingStart { timer } if timer == handle => Some(self.begin_playback(now)),
                _ => self.ignore_stale(handle),
            },
            TimerKind::FadeTick => match phase {
                Phase::Stopping { timer, ramp } if timer == handle => self.fade_tick(timer, ramp),
                _ => self.ignore_stale(handle),
            },
            TimerKind::RevealPoll => match reveal {
                Some(timer) if timer == handle => self.reveal_poll(timer),
                _ => self.ignore_stale(handle),
            },
        }
    }

    fn begin_playback(&mut self, now: Instant) -> ControllerNotice {
        self.media.play();
        self.set_phase(Phase::Playing);
        self.reveal = Some(TimerHandle::new(
            TimerKind::RevealPoll,
            self.generation,
            now + self.settings.reveal_poll,
        ));
        self.events.emit_lossy(PlayerEvent::PlaybackStarted {
            timestamp: chrono::Utc::now(),
        });
        ControllerNotice::Started
    }

    fn fade_tick(&mut self, timer: TimerHandle, mut ramp: VolumeRamp) -> Option<ControllerNotice> {
        let volume = ramp.step(self.volume);
        self.apply_volume(volume);
        debug!("volume={:.3}", volume);
        self.events.emit_lossy(PlayerEvent::VolumeChanged { volume });

        if volume <= 0.0 || ramp.is_complete() {
            return Some(self.finish_stop());
        }

        self.phase = Phase::Stopping {
            timer: timer.rearmed(self.settings.fade_tick),
            ramp,
        };
        None
    }

    fn finish_stop(&mut self) -> ControllerNotice {
        self.stop();
        self.events.emit_lossy(PlayerEvent::PlaybackStopped {
            timestamp: chrono::Utc::now(),
        });
        ControllerNotice::Stopped
    }

    fn reveal_poll(&mut self, timer: TimerHandle) -> Option<ControllerNotice> {
        if self.media.position() > self.settings.reveal_threshold {
            self.reveal = None;
            return Some(ControllerNotice::Revealed);
        }
        self.reveal = Some(timer.rearmed(self.settings.reveal_poll));
        None
    }

    fn ignore_stale(&self, handle: TimerHandle) -> Option<ControllerNotice> {
        debug!(
            "Ignoring stale {} timer (generation {}, current {})",
            handle.kind, handle.generation, self.generation
        );
        None
    }

    fn apply_volume(&mut self, volume: f64) {
        self.volume = volume;
        self.media.set_volume(volume);
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn set_phase(&mut self, phase: Phase) {
        let old_state = self.phase.state();
        self.phase = phase;
        let new_state = self.phase.state();

        if old_state != new_state {
            info!("Playback state changed: {} -> {}", old_state, new_state);
            self.events.emit_lossy(PlayerEvent::PlaybackStateChanged {
                old_state,
                new_state,
                timestamp: chrono::Utc::now(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::media::HeadlessMedia;

    fn controller() -> PlaybackController<HeadlessMedia> {
        PlaybackController::new(
            HeadlessMedia::with_source("clip.mp4"),
            EventBus::new(256),
            ControllerSettings::default(),
        )
    }

    /// Fire every due timer up to `until`, in deadline order
    fn run_until(
        ctrl: &mut PlaybackController<HeadlessMedia>,
        until: Instant,
    ) -> Vec<ControllerNotice> {
        let mut notices = Vec::new();
        while let Some(handle) = ctrl.next_timer() {
            if handle.deadline > until {
                break;
            }
            if let Some(notice) = ctrl.fire(handle, handle.deadline) {
                notices.push(notice);
            }
        }
        notices
    }

    #[test]
    fn test_immediate_start() {
        let mut ctrl = controller();
        let now = Instant::now();

        assert_eq!(ctrl.start(now), Some(ControllerNotice::Started));
        assert_eq!(ctrl.state(), PlaybackState::Playing);
        assert_eq!(ctrl.media().play_count(), 1);
        assert_eq!(ctrl.volume(), 1.0);
    }

    #[test]
    fn test_delayed_start_waits_for_timer() {
        let mut ctrl = controller();
        let now = Instant::now();

        assert_eq!(ctrl.start_with_delay(Duration::from_secs(2), now), None);
        assert_eq!(ctrl.state(), PlaybackState::PendingStart);
        assert!(ctrl.is_playing());
        assert_eq!(ctrl.media().play_count(), 0);

        let timer = ctrl.next_timer().unwrap();
        assert_eq!(timer.kind, TimerKind::StartDelay);
        assert_eq!(timer.deadline, now + Duration::from_secs(2));

        assert_eq!(ctrl.fire(timer, timer.deadline), Some(ControllerNotice::Started));
        assert_eq!(ctrl.state(), PlaybackState::Playing);
        assert_eq!(ctrl.media().play_count(), 1);
    }

    #[test]
    fn test_stop_during_start_delay_prevents_playback() {
        let mut ctrl = controller();
        let now = Instant::now();

        ctrl.start_with_delay(Duration::from_secs(2), now);
        let pending = ctrl.next_timer().unwrap();

        // Hard stop 500ms into the delay
        ctrl.stop();
        assert_eq!(ctrl.state(), PlaybackState::Idle);

        // The old handle fires anyway: must be a no-op
        assert_eq!(ctrl.fire(pending, now + Duration::from_secs(2)), None);
        assert_eq!(ctrl.state(), PlaybackState::Idle);
        assert_eq!(ctrl.media().play_count(), 0);
        assert!(ctrl.next_timer().is_none());
    }

    #[test]
    fn test_fade_stop_two_seconds() {
        let mut ctrl = controller();
        let mut rx = ctrl.events.subscribe();
        let now = Instant::now();

        ctrl.start(now);
        assert_eq!(ctrl.stop_with_fade(Duration::from_millis(2000), now), None);
        assert!(ctrl.is_stopping());
        assert!(ctrl.is_playing());

        let mut ticks = 0;
        let mut last_volume = ctrl.volume();
        let mut stopped = 0;
        while let Some(handle) = ctrl.next_timer() {
            if handle.kind != TimerKind::FadeTick {
                // Reveal poll is still running; drive it too
                ctrl.fire(handle, handle.deadline);
                continue;
            }
            ticks += 1;
            if let Some(ControllerNotice::Stopped) = ctrl.fire(handle, handle.deadline) {
                stopped += 1;
            }
            assert!(ctrl.volume() <= last_volume);
            assert!(ctrl.volume() >= 0.0);
            if ticks == 1 {
                assert!((ctrl.volume() - 0.975).abs() < 1e-9);
            }
            last_volume = ctrl.volume();
        }

        assert_eq!(ticks, 40);
        assert_eq!(stopped, 1);
        assert_eq!(ctrl.volume(), 0.0);
        assert_eq!(ctrl.state(), PlaybackState::Idle);
        assert_eq!(ctrl.media().stop_count(), 1);

        let mut stopped_events = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, PlayerEvent::PlaybackStopped { .. }) {
                stopped_events += 1;
            }
        }
        assert_eq!(stopped_events, 1);
    }

    #[test]
    fn test_zero_length_fade_stops_immediately() {
        let mut ctrl = controller();
        let now = Instant::now();
        ctrl.start(now);

        assert_eq!(
            ctrl.stop_with_fade(Duration::ZERO, now),
            Some(ControllerNotice::Stopped)
        );
        assert_eq!(ctrl.state(), PlaybackState::Idle);
        assert!(ctrl.next_timer().is_none());
    }

    #[test]
    fn test_fade_cancels_pending_start() {
        let mut ctrl = controller();
        let now = Instant::now();

        ctrl.start_with_delay(Duration::from_secs(3), now);
        let pending = ctrl.next_timer().unwrap();
        ctrl.stop_with_fade(Duration::from_millis(100), now);

        assert_eq!(ctrl.fire(pending, now + Duration::from_secs(3)), None);
        assert_eq!(ctrl.state(), PlaybackState::Stopping);

        let notices = run_until(&mut ctrl, now + Duration::from_secs(1));
        assert_eq!(notices, vec![ControllerNotice::Stopped]);
        assert_eq!(ctrl.media().play_count(), 0);
    }

    #[test]
    fn test_start_during_fade_cancels_fade() {
        let mut ctrl = controller();
        let now = Instant::now();

        ctrl.start(now);
        ctrl.stop_with_fade(Duration::from_secs(2), now);
        let tick = ctrl.next_timer().unwrap();
        ctrl.fire(tick, tick.deadline);
        assert!(ctrl.volume() < 1.0);

        ctrl.start(tick.deadline);
        assert_eq!(ctrl.state(), PlaybackState::Playing);
        assert_eq!(ctrl.volume(), 1.0);

        // Stale fade tick does nothing
        let stale = tick.rearmed(DEFAULT_FADE_TICK);
        assert_eq!(ctrl.fire(stale, stale.deadline), None);
        assert_eq!(ctrl.volume(), 1.0);
        assert_eq!(ctrl.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_fade_from_idle_is_noop() {
        let mut ctrl = controller();
        assert_eq!(ctrl.stop_with_fade(Duration::from_secs(2), Instant::now()), None);
        assert_eq!(ctrl.state(), PlaybackState::Idle);
        assert!(ctrl.next_timer().is_none());
    }

    #[test]
    fn test_no_source_is_noop() {
        let mut ctrl = PlaybackController::new(
            HeadlessMedia::new(),
            EventBus::new(16),
            ControllerSettings::default(),
        );
        let now = Instant::now();

        assert_eq!(ctrl.start_with_delay(Duration::from_secs(1), now), None);
        assert_eq!(ctrl.start(now), None);
        ctrl.stop();
        assert_eq!(ctrl.stop_with_fade(Duration::from_secs(1), now), None);

        assert_eq!(ctrl.state(), PlaybackState::Idle);
        assert_eq!(ctrl.generation(), 0);
        assert_eq!(ctrl.media().stop_count(), 0);
    }

    #[test]
    fn test_state_change_events() {
        let mut ctrl = controller();
        let mut rx = ctrl.events.subscribe();
        let now = Instant::now();

        ctrl.start_with_delay(Duration::from_secs(1), now);
        ctrl.stop();

        let mut transitions = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let PlayerEvent::PlaybackStateChanged {
                old_state,
                new_state,
                ..
            } = event
            {
                transitions.push((old_state, new_state));
            }
        }
        assert_eq!(
            transitions,
            vec![
                (PlaybackState::Idle, PlaybackState::PendingStart),
                (PlaybackState::PendingStart, PlaybackState::Idle),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_after_media_advances() {
        let mut ctrl = controller();
        let now = Instant::now();
        ctrl.start(now);

        // Position has not moved yet: the poll re-arms
        let poll = ctrl.next_timer().unwrap();
        assert_eq!(poll.kind, TimerKind::RevealPoll);
        assert_eq!(ctrl.fire(poll, poll.deadline), None);

        tokio::time::advance(Duration::from_millis(150)).await;
        let poll = ctrl.next_timer().unwrap();
        assert_eq!(ctrl.fire(poll, poll.deadline), Some(ControllerNotice::Revealed));
        assert!(ctrl.next_timer().is_none());
    }

    #[test]
    fn test_hard_stop_cancels_reveal() {
        let mut ctrl = controller();
        let now = Instant::now();
        ctrl.start(now);
        let poll = ctrl.next_timer().unwrap();

        ctrl.stop();
        assert!(ctrl.next_timer().is_none());
        assert_eq!(ctrl.fire(poll, poll.deadline), None);
    }
}
