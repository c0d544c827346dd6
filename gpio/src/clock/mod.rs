//! Time source used to pace transmissions to slow peripherals.

pub mod deadline;

use std::fmt::Debug;
use std::thread;
use std::time::{Duration, Instant};

pub use deadline::Deadline;

/// Clock trait defines the timing capability the display drivers need: a monotonic "now",
/// a coarse sleep, and a single busy-wait step.
///
/// For the implementation backed by the operating system, see [SystemClock].
pub trait Clock: Debug {
    /// Gets the current monotonic time.
    fn now(&self) -> Instant;

    /// Yields the processor for at least the given duration.
    ///
    /// Allowed to oversleep by the scheduler's granularity.
    fn sleep(&self, duration: Duration);

    /// Performs a single step of a busy-wait loop.
    fn spin(&self) {
        std::hint::spin_loop();
    }
}

/// [Clock] backed by [Instant] and [thread::sleep].
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
