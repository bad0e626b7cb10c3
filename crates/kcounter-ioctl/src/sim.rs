//! In-process model of the kcounter misc driver.
//!
//! Mirrors the kernel module: one opener at a time (`EBUSY` otherwise, the
//! flag released when the handle is dropped), an open counter baked into the
//! message at open time, `ENOTTY` for any request it does not recognise.
//! Fault switches let tests break the contract on purpose.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::command::{Command, RequestCode};
use crate::device::{ControlHandle, DeviceNode, Payload};

/// Ways the simulated driver can misbehave.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Fail every open with this errno.
    pub refuse_open: Option<i32>,
    /// Report success for the unsupported probe.
    pub accept_probe: bool,
    /// Fail the read-message call with this errno.
    pub fail_read: Option<i32>,
    /// Fill the whole buffer without a NUL terminator.
    pub unterminated: bool,
    /// Report this errno from close. The handle is released regardless.
    pub fail_close: Option<i32>,
}

#[derive(Debug, Default)]
struct Shared {
    path: PathBuf,
    already_open: AtomicBool,
    open_count: AtomicU32,
    closes: AtomicUsize,
    faults: Faults,
    message_override: Option<Vec<u8>>,
    log: Mutex<Vec<RequestCode>>,
}

/// A simulated `/dev/kcounter-rs`. Cloning shares the same driver state.
#[derive(Debug, Clone)]
pub struct SimulatedCounter {
    shared: Arc<Shared>,
}

impl SimulatedCounter {
    /// A well-behaved driver registered at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_faults(path, Faults::default())
    }

    pub fn with_faults(path: impl AsRef<Path>, faults: Faults) -> Self {
        Self {
            shared: Arc::new(Shared {
                path: path.as_ref().to_path_buf(),
                faults,
                ..Shared::default()
            }),
        }
    }

    /// A driver that answers read-message with `message` instead of the
    /// counter greeting. `message` is copied verbatim, so it should carry its
    /// own NUL.
    pub fn with_message(path: impl AsRef<Path>, message: impl Into<Vec<u8>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                path: path.as_ref().to_path_buf(),
                message_override: Some(message.into()),
                ..Shared::default()
            }),
        }
    }

    /// Number of successful opens so far.
    pub fn opens(&self) -> u32 {
        self.shared.open_count.load(Ordering::SeqCst)
    }

    /// Number of closes so far.
    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    /// Whether a handle is currently open.
    pub fn is_open(&self) -> bool {
        self.shared.already_open.load(Ordering::SeqCst)
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<RequestCode> {
        self.log().clone()
    }

    fn log(&self) -> MutexGuard<'_, Vec<RequestCode>> {
        self.shared
            .log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DeviceNode for SimulatedCounter {
    type Handle = SimulatedHandle;

    fn open(&self, path: &Path) -> std::io::Result<SimulatedHandle> {
        if path != self.shared.path {
            return Err(std::io::Error::from_raw_os_error(libc::ENOENT));
        }
        if let Some(errno) = self.shared.faults.refuse_open {
            return Err(std::io::Error::from_raw_os_error(errno));
        }
        if self
            .shared
            .already_open
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("device is open somewhere else");
            return Err(std::io::Error::from_raw_os_error(libc::EBUSY));
        }

        let count = self.shared.open_count.fetch_add(1, Ordering::SeqCst) + 1;
        let message = match &self.shared.message_override {
            Some(message) => message.clone(),
            None => {
                let mut greeting =
                    format!("I already told you {count} times Hello world!\n").into_bytes();
                greeting.push(0);
                greeting
            }
        };

        debug!(count, "opening simulated kcounter");
        Ok(SimulatedHandle {
            device: self.clone(),
            message,
        })
    }
}

/// An open handle on a [`SimulatedCounter`].
#[derive(Debug)]
pub struct SimulatedHandle {
    device: SimulatedCounter,
    message: Vec<u8>,
}

impl SimulatedHandle {
    fn write_message(&self, buf: &mut [u8]) -> std::io::Result<()> {
        let faults = &self.device.shared.faults;
        if let Some(errno) = faults.fail_read {
            return Err(std::io::Error::from_raw_os_error(errno));
        }
        if faults.unterminated {
            buf.fill(b'#');
            return Ok(());
        }
        if self.message.len() > buf.len() {
            return Err(std::io::Error::from_raw_os_error(libc::EFAULT));
        }
        buf[..self.message.len()].copy_from_slice(&self.message);
        Ok(())
    }
}

impl ControlHandle for SimulatedHandle {
    fn send_command(&mut self, request: RequestCode, payload: Payload<'_>) -> std::io::Result<()> {
        self.device.log().push(request);

        match (Command::from_request(request), payload) {
            (Some(Command::ReadMessage), Payload::Read(buf)) => {
                // The driver only trusts _IOC_SIZE(cmd) bytes of user memory.
                let len = request.size().min(buf.len());
                self.write_message(&mut buf[..len])
            }
            (Some(Command::UnsupportedProbe), _) if self.device.shared.faults.accept_probe => {
                Ok(())
            }
            _ => {
                debug!(%request, "ioctl not recognised");
                Err(std::io::Error::from_raw_os_error(libc::ENOTTY))
            }
        }
    }

    fn close(self) -> std::io::Result<()> {
        self.device.shared.closes.fetch_add(1, Ordering::SeqCst);
        debug!("closing simulated kcounter");
        match self.device.shared.faults.fail_close {
            Some(errno) => Err(std::io::Error::from_raw_os_error(errno)),
            None => Ok(()),
        }
    }
}

/// The driver releases its open flag when the file goes away, closed or not.
impl Drop for SimulatedHandle {
    fn drop(&mut self) {
        self.device
            .shared
            .already_open
            .store(false, Ordering::SeqCst);
    }
}
