//! Recording doubles for the pin and clock capabilities.
//!
//! Every pin write and every coarse sleep is appended to a shared [Recorder], stamped with the
//! virtual time of a [MockClock]. [nibbles] then rebuilds what the display would have latched on
//! each falling edge of E.
use crate::clock::Clock;
use crate::{GpioBus, GpioBusOutput, GpioError, GpioOutput, GpioPin, GpioResult};
use std::cell::{Cell, RefCell};
use std::io::ErrorKind;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Virtual time advanced by a single [MockClock::spin].
pub const SPIN_STEP: Duration = Duration::from_micros(1);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Line {
    Rs,
    E,
    Data,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    Configure(Line),
    Write { line: Line, level: bool, at: Duration },
    Bus { values: [bool; 4], at: Duration },
    Sleep(Duration),
}

#[derive(Debug)]
pub struct Recorder {
    origin: Instant,
    elapsed: Cell<Duration>,
    spins: Cell<u32>,
    failing: Cell<Option<Line>>,
    events: RefCell<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Rc<Self> {
        Rc::new(Recorder {
            origin: Instant::now(),
            elapsed: Cell::new(Duration::ZERO),
            spins: Cell::new(0),
            failing: Cell::new(None),
            events: RefCell::new(Vec::new()),
        })
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }

    pub fn spins(&self) -> u32 {
        self.spins.get()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.borrow().len()
    }

    /// Makes every subsequent write to `line` fail.
    pub fn fail(&self, line: Line) {
        self.failing.set(Some(line));
    }

    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn check(&self, line: Line) -> GpioResult<()> {
        match self.failing.get() {
            Some(failing) if failing == line => Err(GpioError::Io(ErrorKind::BrokenPipe)),
            _ => Ok(()),
        }
    }
}

/// Virtual clock. By default sleeping jumps exactly by the requested duration and spinning by
/// [SPIN_STEP].
#[derive(Debug, Clone)]
pub struct MockClock {
    recorder: Rc<Recorder>,
    oversleep: Duration,
    spin_step: Duration,
}

impl MockClock {
    pub fn new(recorder: &Rc<Recorder>) -> Self {
        MockClock {
            recorder: recorder.clone(),
            oversleep: Duration::ZERO,
            spin_step: SPIN_STEP,
        }
    }

    /// A scheduler-like clock: every sleep overshoots by `oversleep`, every spin takes `spin_step`.
    pub fn jittery(recorder: &Rc<Recorder>, oversleep: Duration, spin_step: Duration) -> Self {
        MockClock {
            recorder: recorder.clone(),
            oversleep,
            spin_step,
        }
    }

    fn advance(&self, duration: Duration) {
        let elapsed = &self.recorder.elapsed;
        elapsed.set(elapsed.get() + duration);
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.recorder.origin + self.recorder.elapsed.get()
    }

    fn sleep(&self, duration: Duration) {
        self.recorder.push(Event::Sleep(duration));
        self.advance(duration + self.oversleep);
    }

    fn spin(&self) {
        self.recorder.spins.set(self.recorder.spins.get() + 1);
        self.advance(self.spin_step);
    }
}

#[derive(Debug)]
pub struct MockPin {
    line: Line,
    recorder: Rc<Recorder>,
}

impl MockPin {
    pub fn new(line: Line, recorder: &Rc<Recorder>) -> Self {
        MockPin { line, recorder: recorder.clone() }
    }
}

impl GpioPin for MockPin {
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        self.recorder.push(Event::Configure(self.line));
        Ok(Box::new(MockOutput { line: self.line, recorder: self.recorder.clone() }))
    }
}

#[derive(Debug)]
struct MockOutput {
    line: Line,
    recorder: Rc<Recorder>,
}

impl GpioOutput for MockOutput {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.recorder.check(self.line)?;
        self.recorder.push(Event::Write {
            line: self.line,
            level: value,
            at: self.recorder.elapsed(),
        });
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockBus {
    recorder: Rc<Recorder>,
}

impl MockBus {
    pub fn new(recorder: &Rc<Recorder>) -> Self {
        MockBus { recorder: recorder.clone() }
    }
}

impl GpioBus<4> for MockBus {
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<4> + '_>> {
        self.recorder.push(Event::Configure(Line::Data));
        Ok(Box::new(MockBusOutput { recorder: self.recorder.clone() }))
    }
}

#[derive(Debug)]
struct MockBusOutput {
    recorder: Rc<Recorder>,
}

impl GpioBusOutput<4> for MockBusOutput {
    fn write(&self, values: &[bool; 4]) -> GpioResult<()> {
        self.recorder.check(Line::Data)?;
        self.recorder.push(Event::Bus { values: *values, at: self.recorder.elapsed() });
        Ok(())
    }
}

/// A nibble as latched by the display on the falling edge of E.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Nibble {
    pub value: u8,
    pub rs: bool,
    pub rise: Duration,
    pub fall: Duration,
}

/// Rebuilds the latched nibbles from the recorded events.
///
/// Panics if RS or the data lines change while E is high.
pub fn nibbles(events: &[Event]) -> Vec<Nibble> {
    let mut rs = false;
    let mut data = 0u8;
    let mut high: Option<(Duration, bool, u8)> = None;
    let mut latched = Vec::new();

    for event in events {
        match *event {
            Event::Write { line: Line::Rs, level, .. } => rs = level,
            Event::Bus { values, .. } => {
                data = values
                    .iter()
                    .enumerate()
                    .fold(0, |acc, (i, &bit)| acc | ((bit as u8) << i));
            }
            Event::Write { line: Line::E, level: true, at } => high = Some((at, rs, data)),
            Event::Write { line: Line::E, level: false, at } => {
                if let Some((rise, rs_at_rise, data_at_rise)) = high.take() {
                    assert_eq!(rs_at_rise, rs, "RS changed while E was high");
                    assert_eq!(data_at_rise, data, "data lines changed while E was high");
                    latched.push(Nibble { value: data, rs, rise, fall: at });
                }
            }
            _ => {}
        }
    }

    latched
}

/// Pairs up nibbles into `(byte, rs)` transmissions, high nibble first.
pub fn bytes(nibbles: &[Nibble]) -> Vec<(u8, bool)> {
    assert_eq!(nibbles.len() % 2, 0, "odd number of nibbles");
    nibbles
        .chunks(2)
        .map(|pair| {
            assert_eq!(pair[0].rs, pair[1].rs, "RS changed between nibbles");
            ((pair[0].value << 4) | pair[1].value, pair[0].rs)
        })
        .collect()
}
