use std::fmt;
use std::str::FromStr;

use crate::error::TransportError;

/// Line speeds the raw terminal configuration can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BaudRate {
    B1200,
    B2400,
    B4800,
    /// The vbus line rate.
    #[default]
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl BaudRate {
    /// All supported rates, slowest first.
    pub const ALL: [BaudRate; 8] = [
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
    ];

    /// Bits per second.
    pub fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::B1200 => 1200,
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
        }
    }

    /// Look up a rate by bits per second.
    pub fn from_bits_per_second(bps: u32) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|rate| rate.bits_per_second() == bps)
    }

    /// Platform speed constant for `cfsetispeed`/`cfsetospeed`.
    #[cfg(unix)]
    pub(crate) fn speed(self) -> libc::speed_t {
        match self {
            BaudRate::B1200 => libc::B1200,
            BaudRate::B2400 => libc::B2400,
            BaudRate::B4800 => libc::B4800,
            BaudRate::B9600 => libc::B9600,
            BaudRate::B19200 => libc::B19200,
            BaudRate::B38400 => libc::B38400,
            BaudRate::B57600 => libc::B57600,
            BaudRate::B115200 => libc::B115200,
        }
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits_per_second())
    }
}

impl FromStr for BaudRate {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::from_bits_per_second)
            .ok_or_else(|| TransportError::InvalidBaud(s.to_string()))
    }
}
