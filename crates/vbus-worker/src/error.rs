/// Errors that can occur while starting a worker.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Opening or configuring the device failed.
    #[error("transport error: {0}")]
    Transport(#[from] vbus_transport::TransportError),

    /// The worker thread could not be launched.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(std::io::Error),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
