//! Linear volume ramp for fade-to-silence
//!
//! A fade of length `len` at tick interval `tick` takes exactly
//! `ceil(len / tick)` ticks. Each tick lowers the volume by
//! `1.0 / ticks`, clamped at zero, and the final tick forces zero so
//! floating-point residue never adds an extra tick.

use std::time::Duration;

/// Shortest tick interval accepted; shorter values are clamped
const MIN_TICK: Duration = Duration::from_millis(1);

/// Tick-based linear fade-out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeRamp {
    /// Volume removed per tick
    decrement: f64,

    /// Ticks from full volume to silence
    total_ticks: u32,

    /// Ticks applied so far
    ticks_done: u32,
}

impl VolumeRamp {
    /// Ramp for a fade of `len` at `tick` intervals.
    ///
    /// Returns `None` for a zero-length fade, which callers treat as an
    /// immediate stop.
    pub fn new(len: Duration, tick: Duration) -> Option<Self> {
        let total_ticks = Self::ticks_for(len, tick);
        if total_ticks == 0 {
            return None;
        }
        Some(Self {
            decrement: 1.0 / total_ticks as f64,
            total_ticks,
            ticks_done: 0,
        })
    }

    /// Number of ticks a fade of `len` takes: `ceil(len / tick)`
    pub fn ticks_for(len: Duration, tick: Duration) -> u32 {
        let tick = tick.max(MIN_TICK).as_nanos();
        let len = len.as_nanos();
        let ticks = (len + tick - 1) / tick;
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }

    /// Apply one tick to `volume` and return the new volume.
    ///
    /// Never increases the volume and never goes below zero.
    pub fn step(&mut self, volume: f64) -> f64 {
        self.ticks_done = self.ticks_done.saturating_add(1);
        if self.ticks_done >= self.total_ticks {
            return 0.0;
        }
        (volume - self.decrement).max(0.0)
    }

    pub fn decrement(&self) -> f64 {
        self.decrement
    }

    pub fn total_ticks(&self) -> u32 {
        self.total_ticks
    }

    pub fn is_complete(&self) -> bool {
        self.ticks_done >= self.total_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(50);

    #[test]
    fn test_two_second_fade() {
        let ramp = VolumeRamp::new(Duration::from_millis(2000), TICK).unwrap();
        assert_eq!(ramp.total_ticks(), 40);
        assert!((ramp.decrement() - 0.025).abs() < 1e-12);
    }

    #[test]
    fn test_ticks_round_up() {
        assert_eq!(VolumeRamp::ticks_for(Duration::from_millis(1), TICK), 1);
        assert_eq!(VolumeRamp::ticks_for(Duration::from_millis(50), TICK), 1);
        assert_eq!(VolumeRamp::ticks_for(Duration::from_millis(51), TICK), 2);
        assert_eq!(VolumeRamp::ticks_for(Duration::from_millis(1234), TICK), 25);
    }

    #[test]
    fn test_zero_length_is_none() {
        assert!(VolumeRamp::new(Duration::ZERO, TICK).is_none());
    }

    #[test]
    fn test_zero_tick_is_clamped() {
        assert_eq!(
            VolumeRamp::ticks_for(Duration::from_millis(20), Duration::ZERO),
            20
        );
    }

    #[test]
    fn test_ramp_reaches_zero_in_exact_ticks() {
        for len_ms in [1u64, 49, 50, 51, 333, 1000, 2000, 2999, 5000] {
            let len = Duration::from_millis(len_ms);
            let mut ramp = VolumeRamp::new(len, TICK).unwrap();
            let expected_ticks = (len_ms + 49) / 50;

            let mut volume = 1.0;
            let mut ticks = 0u64;
            while volume > 0.0 {
                let next = ramp.step(volume);
                assert!(next <= volume, "volume must not increase");
                assert!(next >= 0.0, "volume must not go negative");
                volume = next;
                ticks += 1;
                assert!(ticks <= expected_ticks, "ramp overran for {}ms", len_ms);
            }

            assert_eq!(ticks, expected_ticks, "tick count for {}ms", len_ms);
            assert!(ramp.is_complete());
        }
    }

    #[test]
    fn test_ramp_from_partial_volume() {
        let mut ramp = VolumeRamp::new(Duration::from_millis(200), TICK).unwrap();
        // 4 ticks of 0.25; starting at 0.3 the clamp kicks in on tick 2
        let v1 = ramp.step(0.3);
        assert!((v1 - 0.05).abs() < 1e-12);
        let v2 = ramp.step(v1);
        assert_eq!(v2, 0.0);
    }
}
