//! Process exit codes

use rstore_core::Error;

/// Exit codes returned by the `rstore` binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    /// Bad arguments or an invalid query
    UsageError = 2,
    NotFound = 4,
    /// The transfer tool failed or could not be started
    TransferError = 5,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map a core error to the exit code scripts can branch on
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::InvalidQuery(_) => ExitCode::UsageError,
            Error::Transfer { .. } | Error::Spawn { .. } => ExitCode::TransferError,
            Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ExitCode::NotFound,
            _ => ExitCode::GeneralError,
        }
    }
}
