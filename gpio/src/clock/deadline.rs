use crate::clock::{Clock, SystemClock};
use log::trace;
use std::time::{Duration, Instant};

/// Remaining time above which [Deadline::wait] sleeps for all but this much, then busy-waits
/// the rest.
pub const SPIN_THRESHOLD: Duration = Duration::from_micros(500);

/// Earliest point in time at which a new transmission may begin.
///
/// The deadline is only ever moved by [Deadline::set]; [Deadline::wait] consumes it without
/// advancing it, so waiting twice in a row returns immediately the second time.
#[derive(Debug)]
pub struct Deadline<C: Clock = SystemClock> {
    clock: C,
    t: Instant,
    spin_threshold: Duration,
}

impl<C: Clock> Deadline<C> {
    /// Creates a deadline that has already passed.
    pub fn new(clock: C) -> Self {
        let t = clock.now();
        Deadline {
            clock,
            t,
            spin_threshold: SPIN_THRESHOLD,
        }
    }

    /// Sets the remaining time above which waits sleep before spinning. [SPIN_THRESHOLD] by
    /// default.
    pub fn with_spin_threshold(mut self, spin_threshold: Duration) -> Self {
        self.spin_threshold = spin_threshold;
        self
    }

    /// Arms the deadline `delta` from now, overwriting the previous one.
    pub fn set(&mut self, delta: Duration) {
        self.t = self.clock.now() + delta;
    }

    /// Gets the time left until the deadline, zero if it already passed.
    pub fn remaining(&self) -> Duration {
        self.t.saturating_duration_since(self.clock.now())
    }

    /// Blocks until the deadline has passed.
    pub fn wait(&self) {
        self.wait_until(self.t);
    }

    /// Blocks for `duration` from now using the same sleep-then-spin strategy, without touching
    /// the armed deadline.
    pub fn delay(&self, duration: Duration) {
        self.wait_until(self.clock.now() + duration);
    }

    fn wait_until(&self, target: Instant) {
        let remaining = target.saturating_duration_since(self.clock.now());

        if remaining > self.spin_threshold {
            let coarse = remaining - self.spin_threshold;
            trace!("Sleeping for {:?}, spinning for the rest", coarse);
            self.clock.sleep(coarse);
        }

        while self.clock.now() < target {
            self.clock.spin();
        }
    }
}
