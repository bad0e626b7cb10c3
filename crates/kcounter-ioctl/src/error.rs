use std::path::PathBuf;

use crate::command::Command;

/// Errors produced while interpreting a read-message response.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReadError {
    /// No NUL byte inside the buffer capacity.
    #[error("response has no NUL terminator within {capacity} bytes")]
    Unterminated { capacity: usize },
}

/// Errors that abort a control-channel check.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The device node is missing, inaccessible, or not a character device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The driver accepted a command it is required to reject.
    #[error("device accepted {command}, which it must reject")]
    ProtocolViolation { command: Command },

    /// The read-message call failed.
    #[error("failed to read message: {0}")]
    ReadFailure(std::io::Error),

    /// The read-message call succeeded but the payload is not a valid message.
    #[error("invalid message from device: {0}")]
    InvalidMessage(#[from] ReadError),
}

impl ClientError {
    /// The OS error number behind this failure, when there is one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            ClientError::Open { source, .. } | ClientError::ReadFailure(source) => {
                source.raw_os_error()
            }
            ClientError::ProtocolViolation { .. } | ClientError::InvalidMessage(_) => None,
        }
    }

    /// Short name of the step that failed.
    pub fn step(&self) -> &'static str {
        match self {
            ClientError::Open { .. } => "open",
            ClientError::ProtocolViolation { .. } => "probe",
            ClientError::ReadFailure(_) | ClientError::InvalidMessage(_) => "read-message",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
