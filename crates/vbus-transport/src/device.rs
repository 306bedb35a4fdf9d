use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TransportError};

/// Path that selects the process's standard input instead of a device node.
pub const STDIN_PATH: &str = "-";

/// A byte-oriented vbus line: a serial device node or standard input.
///
/// Dropping a file-backed device closes it. Standard input is never closed.
pub struct Device {
    inner: DeviceInner,
    path: PathBuf,
}

enum DeviceInner {
    File(File),
    Stdin(std::io::Stdin),
}

impl Device {
    /// Open a device path for reading and writing.
    ///
    /// [`STDIN_PATH`] selects the already-open standard input, which is handy
    /// for replaying captures through a pipe.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str() == STDIN_PATH {
            return Ok(Self::stdin());
        }

        let mut options = OpenOptions::new();
        options.read(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            // A bus adapter must never become our controlling terminal.
            options.custom_flags(libc::O_NOCTTY);
        }

        let file = options.open(path).map_err(|e| TransportError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "opened device");

        Ok(Self {
            inner: DeviceInner::File(file),
            path: path.to_path_buf(),
        })
    }

    /// Wrap the process's standard input.
    pub fn stdin() -> Self {
        Self {
            inner: DeviceInner::Stdin(std::io::stdin()),
            path: PathBuf::from(STDIN_PATH),
        }
    }

    /// The path this device was opened from (`-` for standard input).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this device is the process's standard input.
    pub fn is_stdin(&self) -> bool {
        matches!(self.inner, DeviceInner::Stdin(_))
    }
}

impl Read for Device {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            DeviceInner::File(file) => file.read(buf),
            DeviceInner::Stdin(stdin) => stdin.read(buf),
        }
    }
}

impl Write for Device {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            DeviceInner::File(file) => file.write(buf),
            DeviceInner::Stdin(_) => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "standard input is read-only",
            )),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            DeviceInner::File(file) => file.flush(),
            DeviceInner::Stdin(_) => Ok(()),
        }
    }
}

#[cfg(unix)]
impl std::os::fd::AsRawFd for Device {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        match &self.inner {
            DeviceInner::File(file) => file.as_raw_fd(),
            DeviceInner::Stdin(stdin) => stdin.as_raw_fd(),
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if let DeviceInner::File(_) = self.inner {
            debug!(path = ?self.path, "closing device");
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            DeviceInner::File(_) => "file",
            DeviceInner::Stdin(_) => "stdin",
        };
        f.debug_struct("Device")
            .field("type", &kind)
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "vbus-transport-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("line.bin")
    }

    #[test]
    fn open_reads_file_contents() {
        let path = temp_path("read");
        std::fs::write(&path, [0xAA, 0x10, 0x00]).unwrap();

        let mut device = Device::open(&path).unwrap();
        assert!(!device.is_stdin());
        assert_eq!(device.path(), path.as_path());

        let mut buf = Vec::new();
        device.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, vec![0xAA, 0x10, 0x00]);

        drop(device);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn open_missing_path_reports_path() {
        let path = temp_path("missing").with_file_name("does-not-exist");
        let err = Device::open(&path).unwrap_err();
        match err {
            TransportError::Open { path: reported, source } => {
                assert_eq!(reported, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn dash_selects_stdin() {
        let device = Device::open(STDIN_PATH).unwrap();
        assert!(device.is_stdin());
        assert_eq!(device.path(), Path::new("-"));
    }

    #[test]
    fn stdin_rejects_writes() {
        let mut device = Device::stdin();
        let err = device.write(&[0x00]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
        assert!(device.flush().is_ok());
    }
}
