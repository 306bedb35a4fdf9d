use std::path::{Path, PathBuf};

use vbus_transport::BaudRate;

/// Startup parameters for a bus worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Device path; `-` reads standard input.
    pub path: PathBuf,
    /// Switch the line to raw mode at `baud` for the worker's lifetime.
    pub raw_mode: bool,
    /// Line speed used when `raw_mode` is set.
    pub baud: BaudRate,
    /// Worker thread name. Defaults to `vbus-<id>`.
    pub thread_name: Option<String>,
}

impl BusConfig {
    /// Configuration for `path` with raw mode off and the default line speed.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            raw_mode: false,
            baud: BaudRate::default(),
            thread_name: None,
        }
    }

    pub fn with_raw_mode(mut self, raw_mode: bool) -> Self {
        self.raw_mode = raw_mode;
        self
    }

    pub fn with_baud(mut self, baud: BaudRate) -> Self {
        self.baud = baud;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = Some(name.into());
        self
    }
}
