//! Frame pacing for the fixed-step host loop

use super::rolling_window::RollingWindow;

pub struct FrameTimer {
    frame_secs: RollingWindow,
    ticks: RollingWindow,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            frame_secs: RollingWindow::new(capacity),
            ticks: RollingWindow::new(capacity),
        }
    }

    /// Record one rendered frame and how many fixed ticks it drained.
    pub fn record(&mut self, frame_secs: f64, ticks: u32) {
        self.frame_secs.push(frame_secs);
        self.ticks.push(ticks as f64);
    }

    pub fn fps(&self) -> f64 {
        let avg = self.frame_secs.mean();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    pub fn frame_time_ms(&self) -> f64 {
        self.frame_secs.mean() * 1000.0
    }

    pub fn ticks_per_frame(&self) -> f64 {
        self.ticks.mean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_frames_and_ticks() {
        let mut timer = FrameTimer::new(4);
        timer.record(0.02, 1);
        timer.record(0.03, 2);
        assert!((timer.frame_time_ms() - 25.0).abs() < 1e-9);
        assert!((timer.fps() - 40.0).abs() < 1e-9);
        assert_eq!(timer.ticks_per_frame(), 1.5);
    }
}
