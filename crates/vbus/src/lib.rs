//! Decode packets from a vbus serial line.
//!
//! vbus is a half-duplex, RS-485 style bus where only the master talks unless
//! a slave is addressed. This crate bundles the layers needed to listen to it.
//!
//! # Crate Structure
//!
//! - [`transport`]: Device access and raw fixed-baud terminal configuration
//! - [`frame`]: Wire format, checksums and the resynchronizing packet reader
//! - [`worker`]: Background reader lifecycle with handler callbacks

/// Re-export transport types.
pub mod transport {
    pub use vbus_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use vbus_frame::*;
}

/// Re-export worker types.
pub mod worker {
    pub use vbus_worker::*;
}

pub use vbus_frame::Packet;
pub use vbus_worker::{spawn, start, BusConfig, PacketHandler, Worker, WorkerExit};
