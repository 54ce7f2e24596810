//! Fixed-step simulation clock
//!
//! Frames accumulate elapsed wall time and drain it in fixed 60 Hz steps.
//! A single frame never contributes more than `max_frame_dt`, so a long
//! stall cannot snowball into an ever-growing backlog of ticks.

use std::time::Duration;

/// Fixed simulation tick rate (60 Hz = 16.666ms per tick)
pub const TICK_RATE_HZ: u32 = 60;
pub const FIXED_DT: f32 = 1.0 / TICK_RATE_HZ as f32;
pub const TICK_DURATION: Duration = Duration::from_micros(16_666); // ~16.666ms

/// Largest frame delta accepted before clamping.
pub const MAX_FRAME_DT: f32 = 0.25;

/// Tolerance so accumulated rounding does not drop a whole tick.
const ACCUMULATOR_EPSILON: f64 = 1e-6;

pub struct FixedStepClock {
    fixed_dt: f32,
    max_frame_dt: f32,
    accumulator: f64,
    tick_count: u64,
    frame_count: u64,
}

impl FixedStepClock {
    pub fn new(fixed_dt: f32, max_frame_dt: f32) -> Self {
        Self {
            fixed_dt,
            max_frame_dt,
            accumulator: 0.0,
            tick_count: 0,
            frame_count: 0,
        }
    }

    /// Clock ticking at `tick_hz`, falling back to 60 Hz for a zero rate.
    pub fn with_rate(tick_hz: u32, max_frame_dt: f32) -> Self {
        let hz = if tick_hz == 0 { TICK_RATE_HZ } else { tick_hz };
        Self::new(1.0 / hz as f32, max_frame_dt)
    }

    /// Add one frame's elapsed time. Returns the clamped delta actually accumulated.
    pub fn begin_frame(&mut self, frame_dt: f32) -> f32 {
        let dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, self.max_frame_dt)
        } else {
            0.0
        };
        self.accumulator += dt as f64;
        self.frame_count += 1;
        dt
    }

    /// Consume one fixed step if enough time has accumulated.
    pub fn next_tick(&mut self) -> bool {
        let step = self.fixed_dt as f64;
        if step <= 0.0 || self.accumulator + ACCUMULATOR_EPSILON < step {
            return false;
        }
        self.accumulator = (self.accumulator - step).max(0.0);
        self.tick_count += 1;
        true
    }

    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Simulated time covered by the ticks run so far.
    pub fn sim_time(&self) -> Duration {
        Duration::from_secs_f64(self.tick_count as f64 * self.fixed_dt as f64)
    }

    /// Fraction of a tick left in the accumulator, for render interpolation.
    pub fn alpha(&self) -> f32 {
        if self.fixed_dt <= 0.0 {
            0.0
        } else {
            (self.accumulator / self.fixed_dt as f64) as f32
        }
    }
}

impl Default for FixedStepClock {
    fn default() -> Self {
        Self::new(FIXED_DT, MAX_FRAME_DT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(clock: &mut FixedStepClock) -> u32 {
        let mut n = 0;
        while clock.next_tick() {
            n += 1;
        }
        n
    }

    #[test]
    fn exact_frame_drains_one_tick() {
        let mut clock = FixedStepClock::default();
        clock.begin_frame(FIXED_DT);
        assert_eq!(drain(&mut clock), 1);
        assert_eq!(clock.tick_count(), 1);
    }

    #[test]
    fn long_frame_is_clamped() {
        let mut clock = FixedStepClock::default();
        let used = clock.begin_frame(3.0);
        assert_eq!(used, MAX_FRAME_DT);
        assert_eq!(drain(&mut clock), 15);
    }

    #[test]
    fn short_frames_accumulate() {
        let mut clock = FixedStepClock::default();
        clock.begin_frame(FIXED_DT * 0.5);
        assert_eq!(drain(&mut clock), 0);
        assert!(clock.alpha() > 0.4);
        clock.begin_frame(FIXED_DT * 0.6);
        assert_eq!(drain(&mut clock), 1);
        assert_eq!(clock.frame_count(), 2);
    }

    #[test]
    fn bad_deltas_are_ignored() {
        let mut clock = FixedStepClock::with_rate(0, MAX_FRAME_DT);
        assert_eq!(clock.begin_frame(f32::NAN), 0.0);
        assert_eq!(clock.begin_frame(-1.0), 0.0);
        assert_eq!(drain(&mut clock), 0);
        assert!((clock.fixed_dt() - FIXED_DT).abs() < 1e-9);
    }
}
