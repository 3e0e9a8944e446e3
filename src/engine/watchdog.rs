// Resettable no-progress deadline for engine runs.

use std::time::{Duration, Instant};

/// Starts with the long `initial` window; every progress tick moves the
/// deadline to `now + progress`.
#[derive(Debug, Clone)]
pub struct Watchdog {
    initial: Duration,
    progress: Duration,
    deadline: Instant,
    ticked: bool,
}

impl Watchdog {
    pub fn new(initial: Duration, progress: Duration) -> Self {
        Self::started_at(Instant::now(), initial, progress)
    }

    pub fn started_at(now: Instant, initial: Duration, progress: Duration) -> Self {
        Self { initial, progress, deadline: now + initial, ticked: false }
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, now: Instant) {
        self.deadline = now + self.progress;
        self.ticked = true;
    }

    pub fn remaining(&self) -> Duration {
        self.remaining_at(Instant::now())
    }

    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// The window currently in force.
    pub fn window(&self) -> Duration {
        if self.ticked {
            self.progress
        } else {
            self.initial
        }
    }
}
