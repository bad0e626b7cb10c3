use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::command::Command;
use crate::device::{ControlHandle, DeviceNode, Payload};
use crate::error::{ClientError, Result};
use crate::message::{DeviceMessage, MessageBuffer};

/// Well-known node registered by the kcounter misc driver.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/kcounter-rs";

/// Where to find the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub device_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(DEFAULT_DEVICE_PATH),
        }
    }
}

/// How the driver answered the unsupported probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeRejection {
    /// OS error number reported for the probe, if any.
    pub errno: Option<i32>,
}

/// Outcome of a passing check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub device_path: PathBuf,
    pub probe: ProbeRejection,
    pub message: DeviceMessage,
}

/// Drives the probe-then-read sequence against a [`DeviceNode`].
#[derive(Debug)]
pub struct ControlChannelClient<N> {
    node: N,
    config: ClientConfig,
}

impl<N: DeviceNode> ControlChannelClient<N> {
    pub fn new(node: N, config: ClientConfig) -> Self {
        Self { node, config }
    }

    pub fn device_path(&self) -> &Path {
        &self.config.device_path
    }

    /// Open the configured node read-write.
    pub fn open_device(&self) -> Result<N::Handle> {
        let path = self.device_path();
        info!(?path, "opening device for reading and writing");
        self.node.open(path).map_err(|source| ClientError::Open {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Run the whole check: open, probe, read, close.
    ///
    /// The handle is closed exactly once whatever the outcome of the calls.
    pub fn run_check(&self) -> Result<CheckReport> {
        let mut handle = self.open_device()?;
        let outcome = exercise(&mut handle);
        close_device(handle, self.device_path());

        let (probe, message) = outcome?;
        info!("check passed");
        Ok(CheckReport {
            device_path: self.device_path().to_path_buf(),
            probe,
            message,
        })
    }
}

fn exercise<H: ControlHandle>(handle: &mut H) -> Result<(ProbeRejection, DeviceMessage)> {
    let probe = issue_unsupported_command(handle)?;

    let mut buffer = MessageBuffer::new();
    let message = issue_read_message(handle, &mut buffer)?;
    Ok((probe, message))
}

/// Send the probe the driver must reject. Rejection is success here.
pub fn issue_unsupported_command<H: ControlHandle>(handle: &mut H) -> Result<ProbeRejection> {
    let command = Command::UnsupportedProbe;
    info!(request = %command.request(), "calling a non-existent ioctl");

    match handle.send_command(command.request(), Payload::None) {
        Ok(()) => {
            warn!(%command, "ioctl failed to fail");
            Err(ClientError::ProtocolViolation { command })
        }
        Err(err) => {
            info!(%err, "ioctl succeeded to fail, as expected");
            Ok(ProbeRejection {
                errno: err.raw_os_error(),
            })
        }
    }
}

/// Ask the driver for its message. `buffer` is re-zeroed first and only
/// interpreted if the call succeeds.
pub fn issue_read_message<H: ControlHandle>(
    handle: &mut H,
    buffer: &mut MessageBuffer,
) -> Result<DeviceMessage> {
    let command = Command::ReadMessage;
    buffer.clear();
    debug!(request = %command.request(), size = command.payload_size(), "reading message");

    handle
        .send_command(command.request(), Payload::Read(buffer.as_mut_bytes()))
        .map_err(ClientError::ReadFailure)?;

    let message = buffer.to_message()?;
    debug!(len = message.len(), "message received");
    Ok(message)
}

/// Release the handle. Close errors cannot change the verdict and are logged.
pub fn close_device<H: ControlHandle>(handle: H, path: &Path) {
    info!(?path, "closing device");
    if let Err(err) = handle.close() {
        warn!(?path, %err, "close failed");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::ReadError;
    use crate::sim::{Faults, SimulatedCounter};

    fn client(dev: &SimulatedCounter) -> ControlChannelClient<&SimulatedCounter> {
        ControlChannelClient::new(dev, ClientConfig::default())
    }

    #[test]
    fn passes_against_well_behaved_driver() {
        let dev = SimulatedCounter::new(DEFAULT_DEVICE_PATH);
        let report = client(&dev).run_check().expect("check should pass");

        assert_eq!(report.probe.errno, Some(libc::ENOTTY));
        assert_eq!(
            report.message.text(),
            "I already told you 1 times Hello world!\n"
        );
        assert_eq!(report.device_path, PathBuf::from(DEFAULT_DEVICE_PATH));
        assert_eq!(dev.closes(), 1);
        assert!(!dev.is_open());
    }

    #[test]
    fn probe_is_issued_before_read() {
        let dev = SimulatedCounter::new(DEFAULT_DEVICE_PATH);
        client(&dev).run_check().unwrap();
        assert_eq!(
            dev.requests(),
            vec![
                Command::UnsupportedProbe.request(),
                Command::ReadMessage.request()
            ]
        );
    }

    #[test]
    fn prints_hello_scenario() {
        let dev = SimulatedCounter::with_message(DEFAULT_DEVICE_PATH, &b"hello\0trailing"[..]);
        let report = client(&dev).run_check().unwrap();
        assert_eq!(report.message.to_string(), "hello");
    }

    #[test]
    fn missing_node_makes_no_calls() {
        let dev = SimulatedCounter::new("/dev/elsewhere");
        let err = client(&dev).run_check().unwrap_err();

        assert!(matches!(err, ClientError::Open { .. }));
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
        assert!(dev.requests().is_empty());
        assert_eq!(dev.closes(), 0);
    }

    #[test]
    fn accepted_probe_aborts_before_read_and_closes() {
        let dev = SimulatedCounter::with_faults(
            DEFAULT_DEVICE_PATH,
            Faults {
                accept_probe: true,
                ..Faults::default()
            },
        );
        let err = client(&dev).run_check().unwrap_err();

        assert!(matches!(
            err,
            ClientError::ProtocolViolation {
                command: Command::UnsupportedProbe
            }
        ));
        assert_eq!(dev.requests(), vec![Command::UnsupportedProbe.request()]);
        assert_eq!(dev.closes(), 1);
    }

    #[test]
    fn read_failure_is_reported_and_closes() {
        let dev = SimulatedCounter::with_faults(
            DEFAULT_DEVICE_PATH,
            Faults {
                fail_read: Some(libc::EBUSY),
                ..Faults::default()
            },
        );
        let err = client(&dev).run_check().unwrap_err();

        assert!(matches!(err, ClientError::ReadFailure(_)));
        assert_eq!(err.raw_os_error(), Some(libc::EBUSY));
        assert_eq!(err.step(), "read-message");
        assert_eq!(dev.closes(), 1);
    }

    #[test]
    fn unterminated_response_is_rejected() {
        let dev = SimulatedCounter::with_faults(
            DEFAULT_DEVICE_PATH,
            Faults {
                unterminated: true,
                ..Faults::default()
            },
        );
        let err = client(&dev).run_check().unwrap_err();

        assert!(matches!(
            err,
            ClientError::InvalidMessage(ReadError::Unterminated { .. })
        ));
        assert_eq!(dev.closes(), 1);
    }

    #[test]
    fn busy_device_fails_open() {
        let dev = SimulatedCounter::new(DEFAULT_DEVICE_PATH);
        let held = dev.open(Path::new(DEFAULT_DEVICE_PATH)).unwrap();

        let err = client(&dev).run_check().unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBUSY));
        assert_eq!(err.step(), "open");

        held.close().unwrap();
        assert_eq!(dev.closes(), 1);
    }

    #[test]
    fn repeated_probe_fails_identically() {
        let dev = SimulatedCounter::new(DEFAULT_DEVICE_PATH);
        let mut handle = dev.open(Path::new(DEFAULT_DEVICE_PATH)).unwrap();

        let first = issue_unsupported_command(&mut handle).unwrap();
        for _ in 0..4 {
            assert_eq!(issue_unsupported_command(&mut handle).unwrap(), first);
        }

        let mut buffer = MessageBuffer::new();
        let message = issue_read_message(&mut handle, &mut buffer).unwrap();
        assert_eq!(message.text(), "I already told you 1 times Hello world!\n");

        close_device(handle, Path::new(DEFAULT_DEVICE_PATH));
        assert_eq!(dev.requests().len(), 6);
    }

    #[test]
    fn read_rezeroes_stale_buffer() {
        let dev = SimulatedCounter::with_message(DEFAULT_DEVICE_PATH, &b"hi\0"[..]);
        let mut handle = dev.open(Path::new(DEFAULT_DEVICE_PATH)).unwrap();

        let mut buffer = MessageBuffer::new();
        buffer.as_mut_bytes().fill(b'z');
        let message = issue_read_message(&mut handle, &mut buffer).unwrap();
        assert_eq!(message.as_bytes(), b"hi");
        assert!(buffer.as_bytes()[3..].iter().all(|b| *b == 0));

        handle.close().unwrap();
    }

    #[test]
    fn custom_path_is_used() {
        let dev = SimulatedCounter::new("/tmp/kcounter-test");
        let config = ClientConfig {
            device_path: PathBuf::from("/tmp/kcounter-test"),
        };
        let report = ControlChannelClient::new(&dev, config).run_check().unwrap();
        assert_eq!(report.device_path, PathBuf::from("/tmp/kcounter-test"));
        assert_eq!(dev.requests()[0], Command::UnsupportedProbe.request());
    }

    #[test]
    fn close_failure_keeps_passing_verdict() {
        let dev = SimulatedCounter::with_faults(
            DEFAULT_DEVICE_PATH,
            Faults {
                fail_close: Some(libc::EIO),
                ..Faults::default()
            },
        );
        let report = client(&dev).run_check().expect("close errors are only logged");

        assert_eq!(report.message.text(), "I already told you 1 times Hello world!\n");
        assert_eq!(dev.closes(), 1);
        assert!(!dev.is_open());
    }

    #[test]
    fn close_failure_keeps_read_failure() {
        let dev = SimulatedCounter::with_faults(
            DEFAULT_DEVICE_PATH,
            Faults {
                fail_read: Some(libc::EBUSY),
                fail_close: Some(libc::EIO),
                ..Faults::default()
            },
        );
        let err = client(&dev).run_check().unwrap_err();

        assert!(matches!(err, ClientError::ReadFailure(_)));
        assert_eq!(err.raw_os_error(), Some(libc::EBUSY));
        assert_eq!(dev.closes(), 1);
    }
}
