use std::time::{Duration, Instant};

use scenelink_shared::Timer;

use crate::config::LinkConfig;

/// Schedules heartbeat sends and measures round-trip latency from acks.
///
/// The next beat is scheduled only once the previous one is resolved: either
/// its ack arrived, or it went unanswered past the ack timeout and was
/// counted missed. Consecutive misses accumulate until the budget is spent;
/// the link owner turns that into a terminal failure.
pub struct HeartbeatTracker {
    interval: Timer,
    ack_timeout: Duration,
    in_flight: Option<Instant>,
    missed: u32,
    latency: Option<Duration>,
}

impl HeartbeatTracker {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            interval: Timer::new(config.heartbeat_interval),
            ack_timeout: config.heartbeat_ack_timeout,
            in_flight: None,
            missed: 0,
            latency: None,
        }
    }

    /// Whether a heartbeat should be sent now
    pub fn due(&self) -> bool {
        self.in_flight.is_none() && self.interval.ringing()
    }

    pub fn mark_sent(&mut self) {
        self.in_flight = Some(Instant::now());
    }

    /// Resolves the in-flight beat with its ack, returning the measured
    /// round-trip latency. Resets the missed counter and schedules the next
    /// beat from now.
    pub fn acked(&mut self) -> Option<Duration> {
        let sent_at = self.in_flight.take()?;
        let round_trip = sent_at.elapsed();
        self.latency = Some(round_trip);
        self.missed = 0;
        self.interval.reset();
        Some(round_trip)
    }

    /// Counts the in-flight beat missed if its ack timeout elapsed,
    /// returning the consecutive-miss total. The interval timer is left
    /// ringing so the replacement beat goes out on the next pump.
    pub fn check_overdue(&mut self) -> Option<u32> {
        let sent_at = self.in_flight?;
        if sent_at.elapsed() < self.ack_timeout {
            return None;
        }
        self.in_flight = None;
        self.missed += 1;
        Some(self.missed)
    }

    /// Latency measured from the most recent ack
    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    pub fn consecutive_missed(&self) -> u32 {
        self.missed
    }
}
