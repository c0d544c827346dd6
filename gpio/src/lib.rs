pub mod clock;
pub mod gpiod;
pub mod lcd;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// A source of GPIO lines, e.g. a GPIO chip.
pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO pins available.
    fn count(&self) -> GpioResult<usize>;

    /// Gets the GPIO pin at the given index.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the index is out of range.
    /// - `GpioError::AlreadyInUse` if the pin is already claimed.
    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>>;

    /// Gets the GPIO pin bus at the specific indices. The first index is the least significant bit.
    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>>;
}

/// A single claimed, active-high GPIO pin. The display drivers only ever drive pins, so the
/// only function exposed is output.
pub trait GpioPin: Debug {
    /// Sets the GPIO pin function to output, allowing writing its state.
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>>;
}

pub trait GpioOutput: Debug {
    /// Writes the state of the GPIO pin.
    fn write(&self, value: bool) -> GpioResult<()>;
}

/// A group of `N` claimed GPIO pins written together, least significant bit first.
pub trait GpioBus<const N: usize>: Debug {
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>>;
}

pub trait GpioBusOutput<const N: usize>: Debug {
    fn write(&self, values: &[bool; N]) -> GpioResult<()>;
}

impl dyn GpioBusOutput<4> + '_ {
    /// Writes the values to the GPIO pins in the bus.
    /// The values are written as a nibble, LSb first.
    pub fn write_nibble(&self, value: u8) -> GpioResult<()> {
        if value > 0b1111 {
            return Err(GpioError::InvalidArgument);
        }

        let mut values = [false; 4];
        for (i, bit) in values.iter_mut().enumerate() {
            *bit = (value & (1 << i)) != 0;
        }
        self.write(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Event, Line, MockBus, Recorder};

    #[test]
    fn write_nibble_maps_bit0_to_first_line() {
        let recorder = Recorder::new();
        let mut bus = MockBus::new(&recorder);
        let output = bus.as_output().unwrap();

        output.write_nibble(0b0100).unwrap();

        assert_eq!(
            recorder.events().last(),
            Some(&Event::Bus { values: [false, false, true, false], at: Default::default() })
        );
        assert_eq!(recorder.events().first(), Some(&Event::Configure(Line::Data)));
    }

    #[test]
    fn write_nibble_rejects_wide_values() {
        let recorder = Recorder::new();
        let mut bus = MockBus::new(&recorder);
        let output = bus.as_output().unwrap();

        assert_eq!(output.write_nibble(0x10), Err(GpioError::InvalidArgument));
        assert_eq!(recorder.events().len(), 1);
    }
}
