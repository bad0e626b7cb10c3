use std::ffi::{CStr, CString};
use std::fmt;

use crate::command::MESSAGE_CAPACITY;
use crate::error::ReadError;

/// Stack buffer handed to the driver by [`Command::ReadMessage`](crate::Command::ReadMessage).
///
/// Starts zeroed. Its contents mean nothing until the call that fills it
/// has reported success.
pub struct MessageBuffer {
    bytes: [u8; MESSAGE_CAPACITY],
}

impl MessageBuffer {
    pub const CAPACITY: usize = MESSAGE_CAPACITY;

    pub const fn new() -> Self {
        Self {
            bytes: [0; MESSAGE_CAPACITY],
        }
    }

    /// Re-zero before reuse so stale bytes are never taken for a response.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Validate the filled buffer.
    pub fn to_message(&self) -> Result<DeviceMessage, ReadError> {
        DeviceMessage::from_response(&self.bytes)
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MessageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBuffer")
            .field("capacity", &Self::CAPACITY)
            .finish_non_exhaustive()
    }
}

/// A message returned by the driver, known to be NUL-terminated and
/// shorter than [`MESSAGE_CAPACITY`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMessage {
    text: CString,
}

impl DeviceMessage {
    /// Interpret a response buffer. Bytes after the first NUL are ignored;
    /// a response without a NUL inside `MESSAGE_CAPACITY` is rejected.
    pub fn from_response(response: &[u8]) -> Result<Self, ReadError> {
        let window = &response[..response.len().min(MESSAGE_CAPACITY)];
        let text = CStr::from_bytes_until_nul(window).map_err(|_| ReadError::Unterminated {
            capacity: MESSAGE_CAPACITY,
        })?;
        Ok(Self {
            text: text.to_owned(),
        })
    }

    /// Message bytes without the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.text.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The message as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        self.text.to_string_lossy().into_owned()
    }
}

impl fmt::Display for DeviceMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text.to_string_lossy())
    }
}
