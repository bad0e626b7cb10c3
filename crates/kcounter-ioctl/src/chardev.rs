use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, IntoRawFd};
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::command::{Command, RequestCode, MESSAGE_CAPACITY};
use crate::device::{ControlHandle, DeviceNode, Payload};

mod ffi {
    use crate::command::{KCOUNTER_MAGIC, READ_MESSAGE_NR, UNSUPPORTED_PROBE_NR};

    nix::ioctl_none!(kcounter_unsupported, KCOUNTER_MAGIC, UNSUPPORTED_PROBE_NR);
    nix::ioctl_read_buf!(kcounter_read_message, KCOUNTER_MAGIC, READ_MESSAGE_NR, u8);
}

/// Opens real character devices and talks to them with `ioctl(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CharDevice;

impl DeviceNode for CharDevice {
    type Handle = CharDeviceHandle;

    fn open(&self, path: &Path) -> std::io::Result<CharDeviceHandle> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let file_type = file.metadata()?.file_type();
        if !file_type.is_char_device() {
            debug!(?path, "not a character device");
            return Err(std::io::Error::from_raw_os_error(libc::ENODEV));
        }

        debug!(?path, fd = file.as_raw_fd(), "opened device node");
        Ok(CharDeviceHandle {
            file,
            path: path.to_path_buf(),
        })
    }
}

/// Open descriptor on a character device.
#[derive(Debug)]
pub struct CharDeviceHandle {
    file: File,
    path: PathBuf,
}

impl ControlHandle for CharDeviceHandle {
    fn send_command(&mut self, request: RequestCode, payload: Payload<'_>) -> std::io::Result<()> {
        let fd = self.file.as_raw_fd();

        // Only the two kcounter requests are issued, each with the payload its
        // encoding declares. Anything else is refused before reaching the kernel.
        let result = match (Command::from_request(request), payload) {
            (Some(Command::UnsupportedProbe), Payload::None) => {
                // SAFETY: `fd` is open for the lifetime of `self` and the
                // request carries no argument.
                unsafe { ffi::kcounter_unsupported(fd) }
            }
            (Some(Command::ReadMessage), Payload::Read(buf)) if buf.len() == MESSAGE_CAPACITY => {
                // SAFETY: `fd` is open for the lifetime of `self`. nix encodes
                // `buf.len()` as the request size, which bounds what the driver
                // may write, and that length matches `Command::ReadMessage`.
                unsafe { ffi::kcounter_read_message(fd, buf) }
            }
            (command, payload) => {
                debug!(%request, ?command, len = payload.len(), "refusing request");
                return Err(std::io::Error::from_raw_os_error(libc::EINVAL));
            }
        };

        match result {
            Ok(rc) => {
                debug!(%request, rc, "ioctl succeeded");
                Ok(())
            }
            Err(errno) => {
                let err = std::io::Error::from(errno);
                debug!(%request, %err, "ioctl failed");
                Err(err)
            }
        }
    }

    fn close(self) -> std::io::Result<()> {
        let fd = self.file.into_raw_fd();
        // SAFETY: `fd` was just released from the owning `File`, so this is the
        // only close of the descriptor.
        let rc = unsafe { libc::close(fd) };
        if rc < 0 {
            return Err(std::io::Error::last_os_error());
        }
        debug!(path = ?self.path, "closed device node");
        Ok(())
    }
}
