//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use tailbar_config::ConfigError;
use tailbar_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Tailscale daemon")]
    #[diagnostic(
        code(tailbar::daemon_unreachable),
        help(
            "Check that tailscaled is running and that you may open its socket.\n\
             Reason: {reason}\n\
             Try: tailbar --socket /path/to/tailscaled.sock status"
        )
    )]
    DaemonUnreachable { reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(tailbar::timeout),
        help("Increase timeout with --timeout or check the daemon's responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(tailbar::not_found),
        help("Run: tailbar {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Daemon ───────────────────────────────────────────────────────
    #[error("Daemon error: {message}")]
    #[diagnostic(code(tailbar::daemon_error))]
    Daemon {
        message: String,
        status: Option<u16>,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tailbar::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(tailbar::config),
        help("Inspect the resolved configuration with: tailbar config show")
    )]
    Config(#[from] ConfigError),

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(tailbar::config_exists),
        help("Pass --force to overwrite it.")
    )]
    ConfigExists { path: String },

    // ── Engine ───────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(tailbar::engine))]
    Engine(CoreError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(tailbar::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DaemonUnreachable { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::ConfigExists { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DaemonUnreachable { reason } | CoreError::StreamEnded { reason } => {
                CliError::DaemonUnreachable { reason }
            }

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::NodeNotFound { identifier } => CliError::NotFound {
                resource_type: "node".into(),
                identifier,
                list_command: "nodes".into(),
            },

            CoreError::LocationNotFound { query } => CliError::NotFound {
                resource_type: "location".into(),
                identifier: query,
                list_command: "exit-node list".into(),
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::UnsupportedField { field } => CliError::Validation {
                field,
                reason: "not a supported preference".into(),
            },

            CoreError::Api { message, status } => CliError::Daemon { message, status },

            CoreError::Decode { message } => CliError::Daemon {
                message: format!("unexpected response: {message}"),
                status: None,
            },

            other @ (CoreError::NotRunning | CoreError::Disposed) => {
                CliError::Engine(other)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_documented_exit_codes() {
        let cases = [
            (
                CoreError::DaemonUnreachable {
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (CoreError::Timeout { timeout_secs: 3 }, exit_code::TIMEOUT),
            (
                CoreError::NodeNotFound {
                    identifier: "n9".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::ValidationFailed {
                    message: "bad".into(),
                },
                exit_code::USAGE,
            ),
            (
                CoreError::Api {
                    message: "denied".into(),
                    status: Some(403),
                },
                exit_code::GENERAL,
            ),
            (CoreError::Disposed, exit_code::GENERAL),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
        assert_ne!(exit_code::SUCCESS, exit_code::GENERAL);
    }
}
