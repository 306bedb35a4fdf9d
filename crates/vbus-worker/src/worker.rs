use std::fmt;
use std::io::{self, Read};
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, trace, warn};
use vbus_frame::{FrameError, PacketReader};
use vbus_transport::Device;

use crate::config::BusConfig;
use crate::error::{Result, WorkerError};
use crate::handler::PacketHandler;
use crate::registry::{self, Registration};

#[cfg(unix)]
type LineMode = vbus_transport::RawMode;
#[cfg(not(unix))]
type LineMode = std::convert::Infallible;

/// Why a worker stopped.
#[derive(Debug)]
pub enum WorkerExit {
    /// The byte source reported end of stream.
    EndOfStream,
    /// A read failed; carries the underlying error.
    Failed(io::Error),
    /// The worker thread panicked, usually inside the handler.
    Panicked,
}

impl WorkerExit {
    /// OS error code of a failed read, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            WorkerExit::Failed(err) => err.raw_os_error(),
            _ => None,
        }
    }

    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, WorkerExit::EndOfStream)
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerExit::EndOfStream => write!(f, "end of stream"),
            WorkerExit::Failed(err) => write!(f, "read failed: {err}"),
            WorkerExit::Panicked => write!(f, "worker panicked"),
        }
    }
}

/// Handle to a running bus worker.
#[derive(Debug)]
pub struct Worker {
    id: u64,
    name: String,
    handle: JoinHandle<WorkerExit>,
}

impl Worker {
    /// Process-unique worker id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name of the worker thread.
    pub fn thread_name(&self) -> &str {
        &self.name
    }

    /// Whether the worker thread has finished, teardown included.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the worker stops.
    ///
    /// By the time this returns the device has been released and the handler
    /// has seen its end-of-stream call.
    pub fn join(self) -> WorkerExit {
        match self.handle.join() {
            Ok(exit) => exit,
            Err(_) => {
                warn!(worker = self.id, "worker thread panicked");
                WorkerExit::Panicked
            }
        }
    }
}

/// Open the configured device and start reading it on a new thread.
///
/// On failure everything acquired so far is released (a changed terminal
/// configuration is put back) and `handler` is dropped without being called.
pub fn start<H: PacketHandler>(config: BusConfig, handler: H) -> Result<Worker> {
    registry::init();

    let device = Device::open(&config.path)?;
    let mode = configure(&device, &config)?;
    debug!(path = ?config.path, raw_mode = config.raw_mode, baud = %config.baud, "device ready");

    let line = Line {
        mode,
        reader: PacketReader::new(device),
    };
    launch(line, handler, config.thread_name)
}

/// Start reading an already-open byte source on a new thread.
pub fn spawn<R, H>(source: R, handler: H) -> Result<Worker>
where
    R: Read + Send + 'static,
    H: PacketHandler,
{
    registry::init();

    let line = Line {
        mode: None,
        reader: PacketReader::new(source),
    };
    launch(line, handler, None)
}

#[cfg(unix)]
fn configure(device: &Device, config: &BusConfig) -> Result<Option<LineMode>> {
    use std::os::fd::AsRawFd;

    if !config.raw_mode {
        return Ok(None);
    }
    let mode = vbus_transport::RawMode::apply(device.as_raw_fd(), config.baud)?;
    Ok(Some(mode))
}

#[cfg(not(unix))]
fn configure(_device: &Device, config: &BusConfig) -> Result<Option<LineMode>> {
    if config.raw_mode {
        return Err(vbus_transport::TransportError::Unsupported("raw terminal mode").into());
    }
    Ok(None)
}

fn launch<R, H>(line: Line<R>, handler: H, thread_name: Option<String>) -> Result<Worker>
where
    R: Read + Send + 'static,
    H: PacketHandler,
{
    let registration = Registration::acquire();
    let id = registration.id();
    let name = thread_name.unwrap_or_else(|| format!("vbus-{id}"));

    let handle = thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            let mut session = Session {
                line: Some(line),
                handler,
                registration,
            };
            session.run()
        })
        .map_err(WorkerError::Spawn)?;

    info!(worker = id, thread = %name, "worker started");
    Ok(Worker { id, name, handle })
}

/// The line a worker reads. Field order makes dropping restore the terminal
/// configuration before the device closes.
struct Line<R> {
    mode: Option<LineMode>,
    reader: PacketReader<R>,
}

/// Worker-thread state. Dropping it is the teardown path, on return and on unwind.
struct Session<R, H: PacketHandler> {
    line: Option<Line<R>>,
    handler: H,
    registration: Registration,
}

impl<R: Read, H: PacketHandler> Session<R, H> {
    fn run(&mut self) -> WorkerExit {
        let id = self.registration.id();
        let Some(line) = self.line.as_mut() else {
            return WorkerExit::EndOfStream;
        };

        loop {
            match line.reader.read_packet() {
                Ok(packet) => {
                    trace!(worker = id, %packet, "delivering packet");
                    self.handler.handle(Some(&packet));
                }
                Err(err) => {
                    let stats = line.reader.stats();
                    info!(
                        worker = id,
                        packets = stats.packets,
                        bytes_read = stats.bytes_read,
                        bytes_skipped = stats.bytes_skipped,
                        checksum_failures = stats.checksum_failures,
                        marker_aborts = stats.marker_aborts,
                        "reader stopped"
                    );
                    return match err {
                        FrameError::ConnectionClosed => WorkerExit::EndOfStream,
                        FrameError::Io(err) => {
                            warn!(worker = id, error = %err, "read failed");
                            WorkerExit::Failed(err)
                        }
                        other => WorkerExit::Failed(io::Error::other(other)),
                    };
                }
            }
        }
    }
}

impl<R, H: PacketHandler> Drop for Session<R, H> {
    fn drop(&mut self) {
        // Restore, close, then signal.
        drop(self.line.take());
        let id = self.registration.id();
        if thread::panicking() {
            // A second panic escaping a destructor during unwinding aborts the process.
            let handler = &mut self.handler;
            if panic::catch_unwind(AssertUnwindSafe(|| handler.handle(None))).is_err() {
                warn!(worker = id, "handler panicked on end of stream");
            }
        } else {
            self.handler.handle(None);
        }
        debug!(worker = id, "worker torn down");
    }
}
