//! Per-system timing for scheduled callbacks

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Accumulated timing for one named system.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemTiming {
    pub total: Duration,
    pub last: Duration,
    pub worst: Duration,
    pub calls: u64,
}

impl SystemTiming {
    pub fn average(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total / self.calls as u32
        }
    }
}

#[derive(Default)]
pub struct SystemProfiler {
    timings: HashMap<String, SystemTiming>,
}

impl SystemProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_system<F, R>(&mut self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        let entry = self.timings.entry(name.to_string()).or_default();
        entry.total += elapsed;
        entry.last = elapsed;
        entry.worst = entry.worst.max(elapsed);
        entry.calls += 1;
        result
    }

    pub fn get_timing(&self, name: &str) -> Duration {
        self.timings.get(name).map(|t| t.total).unwrap_or(Duration::ZERO)
    }

    pub fn timing(&self, name: &str) -> Option<SystemTiming> {
        self.timings.get(name).copied()
    }

    pub fn reset(&mut self) {
        self.timings.clear();
    }

    /// Systems ordered from most to least total time.
    pub fn hottest(&self) -> Vec<(&str, SystemTiming)> {
        let mut out: Vec<_> = self.timings.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        out.sort_by(|a, b| b.1.total.cmp(&a.1.total));
        out
    }
}
