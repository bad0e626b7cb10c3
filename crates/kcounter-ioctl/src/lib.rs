//! Control-channel protocol for the kcounter misc device.
//!
//! The driver registers `/dev/kcounter-rs` and answers two ioctls:
//! - `_IO('|', 0)`, which it must always reject
//! - `_IOR('|', 0x83, [u8; 256])`, which fills the buffer with a
//!   NUL-terminated greeting
//!
//! [`ControlChannelClient`] opens the node, checks that the probe is rejected,
//! then reads and validates the message. The driver is reached only through
//! the [`DeviceNode`] / [`ControlHandle`] traits: [`CharDevice`] talks to the
//! kernel, and `sim::SimulatedCounter` (feature `sim`) stands in for it.

#[cfg(not(unix))]
compile_error!("kcounter-ioctl talks to Unix character devices");

pub mod client;
pub mod command;
pub mod device;
pub mod error;
pub mod message;

#[cfg(unix)]
pub mod chardev;

#[cfg(all(unix, any(test, feature = "sim")))]
pub mod sim;

pub use client::{
    close_device, issue_read_message, issue_unsupported_command, CheckReport, ClientConfig,
    ControlChannelClient, ProbeRejection, DEFAULT_DEVICE_PATH,
};
pub use command::{Command, Direction, RequestCode, KCOUNTER_MAGIC, MESSAGE_CAPACITY};
pub use device::{ControlHandle, DeviceNode, Payload};
pub use error::{ClientError, ReadError, Result};
pub use message::{DeviceMessage, MessageBuffer};

#[cfg(unix)]
pub use chardev::{CharDevice, CharDeviceHandle};
