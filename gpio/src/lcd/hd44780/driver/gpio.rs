use crate::clock::{Clock, Deadline, SystemClock};
use crate::lcd::hd44780::driver::{
    CursorDirection, HD44780Driver, LcdResult, Registers, SETTLE_SHORT,
};
use crate::{GpioBus, GpioBusOutput, GpioOutput, GpioPin};
use log::{debug, trace};
use std::time::Duration;

/// Time the display needs after power-on before it accepts anything.
pub const POWER_ON_DELAY: Duration = Duration::from_millis(40);
/// Wait after the first synchronization nibble.
pub const SYNC_DELAY_FIRST: Duration = Duration::from_micros(4500);
/// Wait after the remaining synchronization nibbles.
pub const SYNC_DELAY: Duration = Duration::from_micros(150);
/// Minimum width of each level of the E pulse.
pub const ENABLE_PULSE_WIDTH: Duration = Duration::from_micros(1);

const SYNC_8BIT: u8 = 0b0011;
const SYNC_4BIT: u8 = 0b0010;
/// Function set: 4-bit bus, 2 lines, 5x8 font.
const FUNCTION_SET: u8 = 0b00101000;

/// Pins the display is wired to. Claimed exclusively by the driver for its whole lifetime.
#[derive(Debug)]
pub struct HD44780Pins<'a> {
    /// Register select pin.
    pub rs: &'a mut dyn GpioPin,
    /// Enable pin.
    pub e: &'a mut dyn GpioPin,
    /// DB4 to DB7, least significant first.
    pub data: &'a mut dyn GpioBus<4>,
}

/// GpioHD44780Driver for HD44780 LCD controllers on a 4-bit GPIO bus, R/W tied to ground.
///
/// Since the busy flag can't be read, each transmission waits on a [Deadline] armed by the
/// previous one with that command's documented processing time. The E pin is held for
/// [ENABLE_PULSE_WIDTH] on each level; the display latches the nibble on the falling edge.
///
/// The driver isn't synchronized. Sharing it between threads needs an external lock.
#[derive(Debug)]
pub struct GpioHD44780Driver<'a, C: Clock = SystemClock> {
    pin_rs: Box<dyn GpioOutput + 'a>,
    pin_e: Box<dyn GpioOutput + 'a>,
    data_bus: Box<dyn GpioBusOutput<4> + 'a>,
    deadline: Deadline<C>,
    registers: Registers,
}

impl<'a> GpioHD44780Driver<'a> {
    /// Sets up the pins and initializes the display, timed by the system clock.
    ///
    /// See [GpioHD44780Driver::with_clock].
    pub fn new(pins: HD44780Pins<'a>) -> LcdResult<Self> {
        Self::with_clock(pins, SystemClock)
    }
}

impl<'a, C: Clock> GpioHD44780Driver<'a, C> {
    /// Sets up the pins and initializes the display.
    ///
    /// All pins are switched to outputs and driven low, then the display is synchronized into
    /// 4-bit mode no matter which mode it powered up in, and configured:
    /// - function set: 4-bit bus, 2 lines, 5x8 font,
    /// - display off,
    /// - clear,
    /// - entry mode: cursor moves right, no display shift,
    /// - display on, cursor hidden.
    ///
    /// The returned driver is ready for use. On error, the display is in an unknown state and
    /// construction has to be repeated.
    pub fn with_clock(pins: HD44780Pins<'a>, clock: C) -> LcdResult<Self> {
        let HD44780Pins { rs, e, data } = pins;

        let pin_rs = rs.as_output()?;
        let pin_e = e.as_output()?;
        let data_bus = data.as_output()?;

        pin_rs.write(false)?;
        pin_e.write(false)?;
        data_bus.write_nibble(0)?;

        let mut driver = GpioHD44780Driver {
            pin_rs,
            pin_e,
            data_bus,
            deadline: Deadline::new(clock),
            registers: Registers::default(),
        };
        driver.init()?;
        Ok(driver)
    }

    fn init(&mut self) -> LcdResult<()> {
        debug!("Initializing HD44780...");

        self.deadline.set(POWER_ON_DELAY);

        // Synchronize: three times 8-bit function set, then switch to 4-bit
        self.pin_rs.write(false)?;
        self.send_nibble(SYNC_8BIT)?;
        self.deadline.set(SYNC_DELAY_FIRST);
        self.send_nibble(SYNC_8BIT)?;
        self.deadline.set(SYNC_DELAY);
        self.send_nibble(SYNC_8BIT)?;
        self.deadline.set(SYNC_DELAY);
        self.send_nibble(SYNC_4BIT)?;
        self.deadline.set(SYNC_DELAY);

        self.send_command(FUNCTION_SET, SETTLE_SHORT)?;

        // Clear while the display is off
        self.set_display_mode(Some(false), Some(false), Some(false))?;
        self.clear()?;
        self.set_entry_mode(Some(CursorDirection::Right), Some(false))?;
        self.set_display_mode(Some(true), None, None)?;

        debug!("HD44780 initialized.");
        Ok(())
    }

    fn pulse_e(&self) -> LcdResult<()> {
        self.pin_e.write(true)?;
        self.deadline.delay(ENABLE_PULSE_WIDTH);
        self.pin_e.write(false)?;
        self.deadline.delay(ENABLE_PULSE_WIDTH);
        Ok(())
    }

    fn send_nibble(&self, nibble: u8) -> LcdResult<()> {
        // Don't start before the display is done with the previous command
        self.deadline.wait();

        self.data_bus.write_nibble(nibble & 0x0F)?;
        self.pulse_e()
    }

    /// Sends a whole byte, high nibble first, and arms the deadline with `settle`.
    fn send(&mut self, data: u8, rs: bool, settle: Duration) -> LcdResult<()> {
        trace!("Sending data: {:08b}, RS: {}", data, rs);

        self.pin_rs.write(rs)?;
        self.send_nibble(data >> 4)?;
        self.send_nibble(data)?;

        self.deadline.set(settle);
        Ok(())
    }
}

impl<C: Clock> HD44780Driver for GpioHD44780Driver<'_, C> {
    fn registers(&self) -> Registers {
        self.registers
    }

    fn set_entry_mode(
        &mut self,
        direction: Option<CursorDirection>,
        shift_enable: Option<bool>,
    ) -> LcdResult<()> {
        self.registers.entry_mode = self.registers.entry_mode.updated(direction, shift_enable);
        self.send_command(self.registers.entry_mode.command(), SETTLE_SHORT)
    }

    fn set_display_mode(
        &mut self,
        display_on: Option<bool>,
        cursor_visible: Option<bool>,
        cursor_blink: Option<bool>,
    ) -> LcdResult<()> {
        self.registers.display_mode =
            self.registers
                .display_mode
                .updated(display_on, cursor_visible, cursor_blink);
        self.send_command(self.registers.display_mode.command(), SETTLE_SHORT)
    }

    fn send_command(&mut self, command: u8, settle: Duration) -> LcdResult<()> {
        self.send(command, false, settle)
    }

    fn send_data(&mut self, data: u8) -> LcdResult<()> {
        self.send(data, true, SETTLE_SHORT)
    }
}
