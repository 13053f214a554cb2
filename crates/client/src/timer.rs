use std::time::Duration;

// Caps how far a stalled frame can push the accumulator.
const MAX_CATCH_UP: u32 = 4;

/// Fixed-period timer advanced by frame deltas.
#[derive(Debug, Clone)]
pub struct Interval {
    period: Duration,
    accumulator: Duration,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            accumulator: Duration::ZERO,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn accumulate(&mut self, delta: Duration) {
        self.accumulator = (self.accumulator + delta).min(self.period * MAX_CATCH_UP);
    }

    pub fn should_tick(&self) -> bool {
        self.accumulator >= self.period
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.period {
            self.accumulator -= self.period;
            true
        } else {
            false
        }
    }

    /// Consumes every elapsed period at once. Periodic work that only cares
    /// about the latest state runs once no matter how far behind it fell.
    pub fn consume_all(&mut self) -> bool {
        let mut fired = false;
        while self.consume_tick() {
            fired = true;
        }
        fired
    }

    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }
}
