use std::fmt;

use kcounter_ioctl::ClientError;

pub const SUCCESS: i32 = 0;
/// Contract violation or failed read. Observed as 255 by the shell.
pub const CHECK_FAILED: i32 = -1;
pub const HEALTH_CHECK_FAILED: i32 = 30;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Open failures exit with the errno, everything after the open with -1.
pub fn client_error(err: ClientError) -> CliError {
    let code = match &err {
        ClientError::Open { source, .. } => source.raw_os_error().unwrap_or(CHECK_FAILED),
        ClientError::ProtocolViolation { .. }
        | ClientError::ReadFailure(_)
        | ClientError::InvalidMessage(_) => CHECK_FAILED,
    };
    CliError::new(code, format!("{}: {err}", err.step()))
}
