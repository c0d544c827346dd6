mod gpio;

use crate::GpioError;
use log::warn;
use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
pub use gpio::*;

/// Processing time of every command except [HD44780Driver::clear] and [HD44780Driver::home],
/// and of every data write.
pub const SETTLE_SHORT: Duration = Duration::from_micros(37);
/// Processing time of [HD44780Driver::clear] and [HD44780Driver::home].
pub const SETTLE_LONG: Duration = Duration::from_micros(1520);

/// Number of display lines.
pub const LINES: u8 = 2;
/// Number of DDRAM cells per line. Only the first 16 are visible unless the display is shifted.
pub const COLUMNS: u8 = 40;
const LINE_STRIDE: u8 = 0x40;

const CMD_CLEAR: u8 = 0b00000001;
const CMD_HOME: u8 = 0b00000010;
const CMD_ENTRY_MODE: u8 = 0b00000100;
const CMD_DISPLAY_MODE: u8 = 0b00001000;
const CMD_CURSOR_SHIFT: u8 = 0b00010000;
const CMD_DISPLAY_SHIFT: u8 = 0b00011000;
const CMD_CGRAM_ADDRESS: u8 = 0b01000000;
const CMD_DDRAM_ADDRESS: u8 = 0b10000000;

const SHIFT_RIGHT: u8 = 0b00000100;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum LcdError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("character {0:?} can't be displayed")]
    Encoding(char),
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),
}

pub type LcdResult<T> = Result<T, LcdError>;

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum CursorDirection {
    /// Moves the cursor to the left after writing data.
    #[default] Left,
    /// Moves the cursor to the right after writing data.
    Right,
}

impl FromStr for CursorDirection {
    type Err = LcdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(CursorDirection::Left),
            "right" => Ok(CursorDirection::Right),
            _ => Err(LcdError::InvalidArgument("expected either left or right")),
        }
    }
}

/// Cached entry mode register.
///
/// Command: `000001IS`.
/// `I` is `1` when the cursor moves right after a write, `0` when it moves left.
/// `S` is `1` when the whole display shifts on a write.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct EntryMode {
    pub direction: CursorDirection,
    pub shift_enable: bool,
}

impl EntryMode {
    /// Returns a copy with the given fields replaced; `None` keeps the current value.
    pub fn updated(self, direction: Option<CursorDirection>, shift_enable: Option<bool>) -> Self {
        EntryMode {
            direction: direction.unwrap_or(self.direction),
            shift_enable: shift_enable.unwrap_or(self.shift_enable),
        }
    }

    pub fn command(&self) -> u8 {
        let mut command = CMD_ENTRY_MODE;
        if self.direction == CursorDirection::Right {
            command |= 0b00000010;
        }
        if self.shift_enable {
            command |= 0b00000001;
        }
        command
    }
}

/// Cached display on/off control register.
///
/// Command: `00001DCB`.
/// `D` is `1` for display on, `C` for a visible cursor, `B` for a blinking cursor.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DisplayMode {
    pub display_on: bool,
    pub cursor_visible: bool,
    pub cursor_blink: bool,
}

impl DisplayMode {
    /// Returns a copy with the given fields replaced; `None` keeps the current value.
    pub fn updated(
        self,
        display_on: Option<bool>,
        cursor_visible: Option<bool>,
        cursor_blink: Option<bool>,
    ) -> Self {
        DisplayMode {
            display_on: display_on.unwrap_or(self.display_on),
            cursor_visible: cursor_visible.unwrap_or(self.cursor_visible),
            cursor_blink: cursor_blink.unwrap_or(self.cursor_blink),
        }
    }

    pub fn command(&self) -> u8 {
        let mut command = CMD_DISPLAY_MODE;
        if self.display_on {
            command |= 0b00000100;
        }
        if self.cursor_visible {
            command |= 0b00000010;
        }
        if self.cursor_blink {
            command |= 0b00000001;
        }
        command
    }
}

/// The write-only controller registers, as last transmitted.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Registers {
    pub entry_mode: EntryMode,
    pub display_mode: DisplayMode,
}

/// The `HD44780Driver` trait defines the command set of an HD44780 controller on top of a
/// write-only transport.
///
/// Implementations only have to provide [HD44780Driver::send_command], [HD44780Driver::send_data]
/// and the two register commands, which need the implementation's cached [Registers]. Every
/// command validates its arguments before anything is sent, so a rejected call leaves both the
/// display and the driver untouched.
pub trait HD44780Driver: Debug {
    /// Gets the cached registers.
    fn registers(&self) -> Registers;

    /// Updates the entry mode register. `None` keeps the previous value of that field.
    fn set_entry_mode(
        &mut self,
        direction: Option<CursorDirection>,
        shift_enable: Option<bool>,
    ) -> LcdResult<()>;

    /// Updates the display control register. `None` keeps the previous value of that field.
    fn set_display_mode(
        &mut self,
        display_on: Option<bool>,
        cursor_visible: Option<bool>,
        cursor_blink: Option<bool>,
    ) -> LcdResult<()>;

    /// Clears the display and sets the cursor to the home position.
    fn clear(&mut self) -> LcdResult<()> {
        self.send_command(CMD_CLEAR, SETTLE_LONG)
    }

    /// Sets the cursor to the home position (0, 0) and undoes any display shift. Text is kept.
    fn home(&mut self) -> LcdResult<()> {
        self.send_command(CMD_HOME, SETTLE_LONG)
    }

    /// Moves the cursor by one cell without writing.
    fn move_cursor(&mut self, direction: CursorDirection) -> LcdResult<()> {
        let command = match direction {
            CursorDirection::Left => CMD_CURSOR_SHIFT,
            CursorDirection::Right => CMD_CURSOR_SHIFT | SHIFT_RIGHT,
        };
        self.send_command(command, SETTLE_SHORT)
    }

    /// Shifts the whole display by one cell. The cursor moves along.
    fn shift_display(&mut self, direction: CursorDirection) -> LcdResult<()> {
        let command = match direction {
            CursorDirection::Left => CMD_DISPLAY_SHIFT,
            CursorDirection::Right => CMD_DISPLAY_SHIFT | SHIFT_RIGHT,
        };
        self.send_command(command, SETTLE_SHORT)
    }

    /// Sets the CGRAM address, so that following writes define custom glyphs.
    ///
    /// # Errors
    /// - `LcdError::InvalidArgument` if the address doesn't fit in 6 bits.
    fn set_cgram_address(&mut self, address: u8) -> LcdResult<()> {
        if address > 0b00111111 {
            return Err(LcdError::InvalidArgument("CGRAM address out of range (0 to 0x3F)"));
        }
        self.send_command(CMD_CGRAM_ADDRESS | address, SETTLE_SHORT)
    }

    /// Sets the DDRAM address, i.e. the cursor position.
    ///
    /// # Errors
    /// - `LcdError::InvalidArgument` if the address doesn't fit in 7 bits.
    fn set_ddram_address(&mut self, address: u8) -> LcdResult<()> {
        if address > 0b01111111 {
            return Err(LcdError::InvalidArgument("DDRAM address out of range (0 to 0x7F)"));
        }
        self.send_command(CMD_DDRAM_ADDRESS | address, SETTLE_SHORT)
    }

    /// Sets the cursor and text insertion position. Both `line` and `column` are 0-indexed.
    ///
    /// # Errors
    /// - `LcdError::InvalidArgument` if `line` is not 0 or 1, or `column` is over 39.
    fn set_cursor(&mut self, line: u8, column: u8) -> LcdResult<()> {
        if line >= LINES {
            return Err(LcdError::InvalidArgument("line out of range (0 to 1)"));
        }
        if column >= COLUMNS {
            return Err(LcdError::InvalidArgument("column out of range (0 to 39)"));
        }
        self.set_ddram_address(line * LINE_STRIDE + column)
    }

    /// Writes the text at the current cursor position.
    ///
    /// Characters are sent one by one; on the first one outside ASCII this fails with
    /// `LcdError::Encoding`, and everything before it stays on the display.
    fn write(&mut self, text: &str) -> LcdResult<()> {
        for c in text.chars() {
            if !c.is_ascii() {
                return Err(LcdError::Encoding(c));
            }
            self.send_data(c as u8)?;
        }
        Ok(())
    }

    /// Writes the text, replacing characters outside ASCII with `?`.
    fn write_lossy(&mut self, text: &str) -> LcdResult<()> {
        for c in text.chars() {
            if c.is_ascii() {
                self.send_data(c as u8)?;
            } else {
                warn!("Non-ASCII character: {}", c);
                self.send_data(b'?')?;
            }
        }
        Ok(())
    }

    /// Writes raw character codes from the display's own character set, e.g. CGRAM glyphs 0 to 7.
    fn write_bytes(&mut self, bytes: &[u8]) -> LcdResult<()> {
        for &byte in bytes {
            self.send_data(byte)?;
        }
        Ok(())
    }

    // Low-level commands
    // These are used by the high-level functions above and implemented by the transport.

    /// Sends a command byte with RS low, then keeps the bus idle for `settle`.
    fn send_command(&mut self, command: u8, settle: Duration) -> LcdResult<()>;

    /// Sends a data byte with RS high to the current RAM address, then keeps the bus idle for
    /// [SETTLE_SHORT]. The address counter moves according to the entry mode.
    fn send_data(&mut self, data: u8) -> LcdResult<()>;
}
