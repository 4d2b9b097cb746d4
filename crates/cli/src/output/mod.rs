//! Output formatting
//!
//! Human-readable output by default; `--json` switches every command to a
//! single JSON document on stdout.

mod formatter;

pub use formatter::Formatter;

/// Output settings shared by all commands
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Emit JSON instead of text
    pub json: bool,
    /// Disable colors
    pub no_color: bool,
    /// Suppress non-error output
    pub quiet: bool,
}
