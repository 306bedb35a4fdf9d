use std::mem::MaybeUninit;
use std::os::fd::RawFd;

use tracing::{debug, warn};

use crate::baud::BaudRate;
use crate::error::{Result, TransportError};

/// Raw, fixed-baud terminal configuration for a serial line.
///
/// Holds the configuration that was active before [`RawMode::apply`] so it can
/// be put back. Dropping a `RawMode` restores it if [`RawMode::restore`] has not
/// already run. The guard must not outlive the descriptor it was applied to.
pub struct RawMode {
    fd: RawFd,
    saved: libc::termios,
    baud: BaudRate,
    restored: bool,
}

impl RawMode {
    /// Save the current configuration of `fd`, then switch it to raw mode at `baud`.
    pub fn apply(fd: RawFd, baud: BaudRate) -> Result<Self> {
        let saved = get_attr(fd)?;

        let mut raw = saved;
        // SAFETY: `raw` is an initialized termios value owned by this frame.
        unsafe { libc::cfmakeraw(&mut raw) };
        set_speed(&mut raw, baud)?;
        set_attr(fd, &raw)?;

        debug!(fd, %baud, "applied raw terminal mode");
        Ok(Self {
            fd,
            saved,
            baud,
            restored: false,
        })
    }

    /// Put back the configuration saved by [`RawMode::apply`].
    ///
    /// Calling this more than once is a no-op.
    pub fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        set_attr(self.fd, &self.saved)?;
        debug!(fd = self.fd, "restored terminal configuration");
        Ok(())
    }

    /// Line speed applied by this guard.
    pub fn baud(&self) -> BaudRate {
        self.baud
    }

    /// Whether the saved configuration has been put back.
    pub fn is_restored(&self) -> bool {
        self.restored
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            warn!(fd = self.fd, error = %err, "failed to restore terminal configuration");
        }
    }
}

impl std::fmt::Debug for RawMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawMode")
            .field("fd", &self.fd)
            .field("baud", &self.baud)
            .field("restored", &self.restored)
            .finish()
    }
}

fn get_attr(fd: RawFd) -> Result<libc::termios> {
    let mut attr = MaybeUninit::<libc::termios>::uninit();
    // SAFETY: `attr` points to writable storage sized for a termios struct;
    // tcgetattr fully initializes it when it returns 0.
    let rc = unsafe { libc::tcgetattr(fd, attr.as_mut_ptr()) };
    if rc != 0 {
        return Err(TransportError::Configure {
            op: "tcgetattr",
            source: std::io::Error::last_os_error(),
        });
    }
    // SAFETY: tcgetattr succeeded, so the value is initialized.
    Ok(unsafe { attr.assume_init() })
}

fn set_attr(fd: RawFd, attr: &libc::termios) -> Result<()> {
    // SAFETY: `attr` is a valid, initialized termios value for the duration of the call.
    let rc = unsafe { libc::tcsetattr(fd, libc::TCSANOW, attr) };
    if rc != 0 {
        return Err(TransportError::Configure {
            op: "tcsetattr",
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

fn set_speed(attr: &mut libc::termios, baud: BaudRate) -> Result<()> {
    let speed = baud.speed();
    // SAFETY: `attr` is a valid, initialized termios value borrowed mutably.
    let rc = unsafe { libc::cfsetispeed(attr, speed) };
    if rc != 0 {
        return Err(TransportError::Configure {
            op: "cfsetispeed",
            source: std::io::Error::last_os_error(),
        });
    }
    // SAFETY: as above.
    let rc = unsafe { libc::cfsetospeed(attr, speed) };
    if rc != 0 {
        return Err(TransportError::Configure {
            op: "cfsetospeed",
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::os::fd::AsRawFd;

    use super::*;
    use crate::device::Device;

    #[test]
    fn apply_on_regular_file_fails_on_query() {
        let path = std::env::temp_dir().join(format!(
            "vbus-termios-regular-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::write(&path, b"not a tty").unwrap();
        let device = Device::open(&path).unwrap();

        let err = RawMode::apply(device.as_raw_fd(), BaudRate::B9600).unwrap_err();
        assert!(matches!(err, TransportError::Configure { op: "tcgetattr", .. }));

        drop(device);
        let _ = std::fs::remove_file(&path);
    }

    #[cfg(target_os = "linux")]
    struct Pty {
        master: RawFd,
        slave_path: std::path::PathBuf,
    }

    #[cfg(target_os = "linux")]
    impl Pty {
        fn open() -> Self {
            // SAFETY: plain libc calls on a descriptor we own; every return code is checked.
            unsafe {
                let master = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
                assert!(master >= 0, "posix_openpt failed");
                assert_eq!(libc::grantpt(master), 0, "grantpt failed");
                assert_eq!(libc::unlockpt(master), 0, "unlockpt failed");
                let mut name = [0 as libc::c_char; 128];
                assert_eq!(
                    libc::ptsname_r(master, name.as_mut_ptr(), name.len()),
                    0,
                    "ptsname_r failed"
                );
                let slave = std::ffi::CStr::from_ptr(name.as_ptr())
                    .to_string_lossy()
                    .into_owned();
                Self {
                    master,
                    slave_path: slave.into(),
                }
            }
        }
    }

    #[cfg(target_os = "linux")]
    impl Drop for Pty {
        fn drop(&mut self) {
            // SAFETY: `master` was returned by posix_openpt and is closed exactly once.
            unsafe { libc::close(self.master) };
        }
    }

    #[cfg(target_os = "linux")]
    fn output_speed(fd: RawFd) -> libc::speed_t {
        let attr = get_attr(fd).unwrap();
        // SAFETY: `attr` is an initialized termios value.
        unsafe { libc::cfgetospeed(&attr) }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn apply_and_restore_on_pty() {
        let pty = Pty::open();
        let device = Device::open(&pty.slave_path).unwrap();
        let fd = device.as_raw_fd();

        let before = get_attr(fd).unwrap();
        let mut mode = RawMode::apply(fd, BaudRate::B19200).unwrap();
        assert_eq!(mode.baud(), BaudRate::B19200);
        assert_eq!(output_speed(fd), libc::B19200);

        let raw = get_attr(fd).unwrap();
        assert_eq!(raw.c_lflag & libc::ICANON, 0, "raw mode must disable canonical input");
        assert_eq!(raw.c_lflag & libc::ECHO, 0, "raw mode must disable echo");

        mode.restore().unwrap();
        assert!(mode.is_restored());
        let after = get_attr(fd).unwrap();
        assert_eq!(after.c_lflag, before.c_lflag);
        assert_eq!(after.c_iflag, before.c_iflag);

        // Second restore is a no-op.
        mode.restore().unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn drop_restores_configuration() {
        let pty = Pty::open();
        let device = Device::open(&pty.slave_path).unwrap();
        let fd = device.as_raw_fd();

        let before = get_attr(fd).unwrap();
        {
            let _mode = RawMode::apply(fd, BaudRate::B115200).unwrap();
            assert_eq!(output_speed(fd), libc::B115200);
        }
        let after = get_attr(fd).unwrap();
        assert_eq!(after.c_lflag, before.c_lflag);
        // SAFETY: both values are initialized termios structs.
        let (was, now) = unsafe { (libc::cfgetospeed(&before), libc::cfgetospeed(&after)) };
        assert_eq!(was, now);
    }
}
