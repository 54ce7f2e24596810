//! Fixed-capacity window of recent samples

pub struct RollingWindow {
    samples: Vec<f64>,
    capacity: usize,
    cursor: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    pub fn push(&mut self, sample: f64) {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.cursor] = sample;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn max(&self) -> f64 {
        self.samples.iter().copied().fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_overwrites_oldest_sample() {
        let mut window = RollingWindow::new(3);
        window.push(1.0);
        window.push(2.0);
        window.push(3.0);
        assert_eq!(window.mean(), 2.0);

        window.push(6.0); // replaces 1.0
        assert_eq!(window.len(), 3);
        assert!((window.mean() - 11.0 / 3.0).abs() < 1e-9);
        assert_eq!(window.max(), 6.0);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut window = RollingWindow::new(0);
        window.push(4.0);
        window.push(5.0);
        assert_eq!(window.len(), 1);
        assert_eq!(window.mean(), 5.0);
    }
}
