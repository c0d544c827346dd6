//! HD44780 LCD module.
//!
//! Write-only driver for HD44780-compatible character displays (16x2 and friends) attached over
//! a 4-bit parallel bus. The R/W pin is expected to be tied to ground, so the busy flag can't be
//! polled; instead every command is followed by its documented processing time, enforced with a
//! [Deadline](crate::clock::Deadline).
//!
//! See [driver::HD44780Driver] for the command set and [driver::GpioHD44780Driver] for the GPIO
//! transport.

pub mod driver;
