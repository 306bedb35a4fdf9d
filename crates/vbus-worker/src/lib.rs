//! Background reader lifecycle for vbus.
//!
//! [`start`] opens a line, optionally switches it to raw fixed-baud mode and
//! runs a [`PacketReader`](vbus_frame::PacketReader) on a dedicated thread.
//! Every validated packet is passed to a [`PacketHandler`] on that thread;
//! when the stream ends the handler is called once more with `None`.
//! [`Worker::join`] waits for the thread and reports why it stopped.
//!
//! ```no_run
//! use vbus_frame::Packet;
//! use vbus_worker::{start, BusConfig};
//!
//! let worker = start(
//!     BusConfig::new("/dev/ttyUSB0").with_raw_mode(true),
//!     |packet: Option<&Packet>| match packet {
//!         Some(packet) => println!("{packet}"),
//!         None => println!("end of stream"),
//!     },
//! )?;
//! let exit = worker.join();
//! println!("worker stopped: {exit}");
//! # Ok::<(), vbus_worker::WorkerError>(())
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod registry;
pub mod worker;

pub use config::BusConfig;
pub use error::{Result, WorkerError};
pub use handler::PacketHandler;
pub use worker::{spawn, start, Worker, WorkerExit};
