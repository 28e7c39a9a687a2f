use std::time::{Duration, Instant};

/// A wall-clock interval timer. `ringing()` reports whether the interval has
/// elapsed since the last `reset()`; the owner resets it after acting.
pub struct Timer {
    interval: Duration,
    last: Instant,
}

impl Timer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Instant::now(),
        }
    }

    pub fn ringing(&self) -> bool {
        self.last.elapsed() >= self.interval
    }

    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn elapsed(&self) -> Duration {
        self.last.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rings_after_interval() {
        let timer = Timer::new(Duration::ZERO);
        assert!(timer.ringing());
    }

    #[test]
    fn reset_rearms() {
        let mut timer = Timer::new(Duration::from_secs(3600));
        assert!(!timer.ringing());
        timer.reset();
        assert!(!timer.ringing());
    }
}
