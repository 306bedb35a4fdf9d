use std::fmt;
use std::io;

use vbus_transport::TransportError;
use vbus_worker::{WorkerError, WorkerExit};

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => TRANSPORT_ERROR,
        io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData => DATA_INVALID,
        _ => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { path, source } => {
            io_error(&format!("{context}: {}", path.display()), source)
        }
        TransportError::InvalidBaud(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn worker_error(context: &str, err: WorkerError) -> CliError {
    match err {
        WorkerError::Transport(err) => transport_error(context, err),
        WorkerError::Spawn(err) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

pub fn worker_exit(exit: WorkerExit) -> CliResult<i32> {
    match exit {
        WorkerExit::EndOfStream => Ok(SUCCESS),
        WorkerExit::Failed(err) => Err(io_error("read failed", err)),
        WorkerExit::Panicked => Err(CliError::new(INTERNAL, "reader thread panicked")),
    }
}
