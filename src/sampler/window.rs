// SPDX-License-Identifier: MIT
use std::time::{Duration, Instant};

/// Running brightness sum for one camera over the current window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Window {
    sum: f64,
    count: u64,
}

impl Window {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Closes the window: returns its average (`None` when no samples were
    /// taken) and resets it to zero.
    pub fn rollover(&mut self) -> Option<f64> {
        let average = if self.count == 0 {
            None
        } else {
            #[allow(clippy::cast_precision_loss)]
            let count = self.count as f64;
            Some(self.sum / count)
        };
        *self = Self::default();
        average
    }
}

/// Tracks window boundaries against a monotonic clock.
///
/// The clock never reads the time itself; the caller passes `now` so that a
/// session can be driven with synthetic instants.
#[derive(Clone, Debug)]
pub struct WindowClock {
    start: Instant,
    window: Duration,
    boundaries_passed: u64,
}

impl WindowClock {
    #[must_use]
    pub fn new(start: Instant, window: Duration) -> Self {
        Self {
            start,
            window,
            boundaries_passed: 0,
        }
    }

    /// Number of boundaries crossed since the previous call.
    ///
    /// Usually 0 or 1; larger when the caller stalled across several windows.
    pub fn due(&mut self, now: Instant) -> u64 {
        let total = self.boundaries_at(now);
        let due = total.saturating_sub(self.boundaries_passed);
        self.boundaries_passed = self.boundaries_passed.max(total);
        due
    }

    #[must_use]
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start)
    }

    fn boundaries_at(&self, now: Instant) -> u64 {
        let elapsed = self.elapsed(now).as_nanos();
        let window = self.window.as_nanos().max(1);
        u64::try_from(elapsed / window).unwrap_or(u64::MAX)
    }
}
