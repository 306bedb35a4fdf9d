//! Device layer for reading a vbus line.
//!
//! Provides the byte stream the decoder consumes:
//! - [`Device`], a serial device path or the process's standard input
//! - [`RawMode`], raw fixed-baud terminal configuration with save/restore (unix)
//!
//! This is the lowest layer of vbus. Opening and configuring the line happens
//! once, before the reader starts.

pub mod baud;
pub mod device;
pub mod error;

#[cfg(unix)]
pub mod termios;

pub use baud::BaudRate;
pub use device::{Device, STDIN_PATH};
pub use error::{Result, TransportError};

#[cfg(unix)]
pub use termios::RawMode;
