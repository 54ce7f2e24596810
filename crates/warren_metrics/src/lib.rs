//! Warren Metrics - lightweight instrumentation for the simulation loop
//!
//! Times scheduled systems, counts per-tick events and tracks frame pacing.
//! Everything here compiles down to no-op stubs unless the `metrics`
//! feature is enabled.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use warren_metrics::SystemProfiler;
//!
//! let mut profiler = SystemProfiler::new();
//! let moved = profiler.time_system("physics", || step_physics());
//! println!("physics: {:?}", profiler.get_timing("physics"));
//! ```

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod frame_timer;
#[cfg(feature = "metrics")]
mod rolling_window;
#[cfg(feature = "metrics")]
mod system_profiler;

#[cfg(feature = "metrics")]
pub use counter::Counter;
#[cfg(feature = "metrics")]
pub use frame_timer::FrameTimer;
#[cfg(feature = "metrics")]
pub use rolling_window::RollingWindow;
#[cfg(feature = "metrics")]
pub use system_profiler::{SystemProfiler, SystemTiming};

// ============================================================================
// Macros for conditional compilation
// ============================================================================

/// Execute code only when metrics are enabled
#[macro_export]
macro_rules! metrics {
    ($($tt:tt)*) => {
        #[cfg(feature = "metrics")]
        {
            $($tt)*
        }
    };
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemTiming {
    pub total: std::time::Duration,
    pub last: std::time::Duration,
    pub worst: std::time::Duration,
    pub calls: u64,
}

#[cfg(not(feature = "metrics"))]
#[derive(Default)]
pub struct SystemProfiler;

#[cfg(not(feature = "metrics"))]
impl SystemProfiler {
    pub fn new() -> Self { Self }
    pub fn time_system<F, R>(&mut self, _name: &str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn get_timing(&self, _name: &str) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn timing(&self, _name: &str) -> Option<SystemTiming> { None }
    pub fn reset(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
#[derive(Default)]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &str, _value: u64) {}
    pub fn set(&mut self, _name: &str, _value: u64) {}
    pub fn get(&self, _name: &str) -> u64 { 0 }
    pub fn take(&mut self, _name: &str) -> u64 { 0 }
}

#[cfg(not(feature = "metrics"))]
pub struct FrameTimer;

#[cfg(not(feature = "metrics"))]
impl FrameTimer {
    pub fn new(_capacity: usize) -> Self { Self }
    pub fn record(&mut self, _frame_secs: f64, _ticks: u32) {}
    pub fn fps(&self) -> f64 { 0.0 }
    pub fn frame_time_ms(&self) -> f64 { 0.0 }
    pub fn ticks_per_frame(&self) -> f64 { 0.0 }
}

#[cfg(test)]
mod tests {
    #[test]
    fn stubs_are_usable_without_metrics() {
        let mut profiler = super::SystemProfiler::new();
        let out = profiler.time_system("noop", || 7);
        assert_eq!(out, 7);

        let mut counter = super::Counter::new();
        counter.increment("pairs", 3);

        let mut timer = super::FrameTimer::new(60);
        timer.record(1.0 / 60.0, 1);
    }
}
