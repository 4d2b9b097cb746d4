//! Error types for rstore-core
//!
//! A single error enum shared by every storage kind, so retry policy and the
//! CLI exit-code mapping only have to understand one type.

use std::io;

/// Result alias used throughout rstore
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by query handling, metadata probing and transfers
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The query is not acceptable for this storage kind
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Filesystem error while probing or preparing a transfer
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The transfer tool exited with a nonzero status
    #[error("{command} failed ({status}): {output}")]
    Transfer {
        /// Rendered command line
        command: String,
        /// Exit status description
        status: String,
        /// Captured stdout and stderr, unmodified
        output: String,
    },

    /// The transfer tool could not be launched at all
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The storage kind does not offer the requested capability
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Whether a retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        crate::retry::is_retryable_error(self)
    }

    /// Captured tool output, if this is a transfer failure
    pub fn transfer_output(&self) -> Option<&str> {
        match self {
            Error::Transfer { output, .. } => Some(output),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_display_contains_output() {
        let err = Error::Transfer {
            command: "rsync -av a b".to_string(),
            status: "exit status: 23".to_string(),
            output: "rsync: link_stat \"a\" failed: No such file or directory (2)\n".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("rsync: link_stat \"a\" failed: No such file or directory (2)\n"));
        assert!(msg.starts_with("rsync -av a b failed"));
        assert_eq!(
            err.transfer_output(),
            Some("rsync: link_stat \"a\" failed: No such file or directory (2)\n")
        );
    }

    #[test]
    fn test_io_from() {
        let err: Error = io::Error::new(io::ErrorKind::TimedOut, "slow disk").into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.transfer_output().is_none());
    }
}
