//! SSD1680 ePaper Display Driver
//!
//! Drives the 2.9" 296x128 black and white panel of the
//! [Adafruit MagTag](https://learn.adafruit.com/adafruit-magtag).
//!
//! The controller RAM is 128 pixels wide and 296 lines tall, the screen is
//! used in landscape. [`crate::render::Framebuffer`] takes care of the
//! rotation so the bytes it holds can be sent to RAM as they are.
//!
//! ### Usage
//!
//! 1. draw onto a [`crate::render::Framebuffer`] with
//!    [`embedded_graphics`](https://github.com/jamwaffles/embedded-graphics)
//! 1. hand its bytes to [`driver::Ssd1680::refresh`], which writes RAM,
//!    runs a full update and waits for BUSY to drop
//! 1. call [`driver::Ssd1680::sleep`] before deep sleep, the next refresh
//!    wakes the controller up again

pub mod driver;
pub mod interface;

mod cmd;
mod flag;

/// RAM width, pixels per gate line
pub const WIDTH: u16 = 128;

/// RAM height, gate lines
pub const HEIGHT: u16 = 296;

/// Bytes in one full black and white frame
pub const BUFFER_SIZE: usize = (WIDTH as usize / 8) * HEIGHT as usize;

pub use driver::Ssd1680;
