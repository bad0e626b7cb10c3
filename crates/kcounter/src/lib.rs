//! Diagnostic client for the kcounter misc device.
//!
//! The `kcounter` binary opens `/dev/kcounter-rs`, checks that the driver
//! rejects an unsupported ioctl, then reads and prints the driver's message.
//!
//! # Crate Structure
//!
//! - [`ioctl`]: command encoding, device traits, and the check sequence

/// Re-export the control-channel protocol.
pub mod ioctl {
    pub use kcounter_ioctl::*;
}
