// ── Core error types ──
//
// User-facing errors from tailbar-core. Consumers never see hyper errors
// or raw socket failures directly; the `From<tailbar_api::Error>` impl
// translates transport-layer errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the Tailscale daemon: {reason}")]
    DaemonUnreachable { reason: String },

    #[error("Daemon request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Update stream ended: {reason}")]
    StreamEnded { reason: String },

    #[error("Engine is not running")]
    NotRunning,

    #[error("Engine has been disposed")]
    Disposed,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Node not found: {identifier}")]
    NodeNotFound { identifier: String },

    #[error("Location not found: {query}")]
    LocationNotFound { query: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Unsupported preference field: {field}")]
    UnsupportedField { field: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Daemon error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if the daemon answered).
        status: Option<u16>,
    },

    #[error("Malformed daemon response: {message}")]
    Decode { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<tailbar_api::Error> for CoreError {
    fn from(err: tailbar_api::Error) -> Self {
        use tailbar_api::Error as Api;

        match err {
            Api::Connect { .. } => CoreError::DaemonUnreachable {
                reason: err.to_string(),
            },
            Api::Http(ref e) => {
                if e.is_closed() || e.is_incomplete_message() {
                    CoreError::DaemonUnreachable {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: None,
                    }
                }
            }
            Api::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            Api::Status { status: 404, message } => CoreError::Api {
                message: format!("endpoint not found ({message})"),
                status: Some(404),
            },
            Api::Status { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            Api::StreamDropped(reason) => CoreError::StreamEnded { reason },
            Api::Deserialization { message, body: _ } => CoreError::Decode { message },
            Api::UnsupportedField(field) => CoreError::UnsupportedField { field },
            Api::InvalidRequest(message) => CoreError::ValidationFailed { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn connect_failure_maps_to_unreachable() {
        let err = CoreError::from(tailbar_api::Error::Connect {
            path: PathBuf::from("/var/run/tailscale/tailscaled.sock"),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        });
        assert!(matches!(err, CoreError::DaemonUnreachable { .. }));
        assert!(err.to_string().contains("tailscaled.sock"));
    }

    #[test]
    fn status_keeps_code() {
        let err = CoreError::from(tailbar_api::Error::Status {
            status: 403,
            message: "access denied".into(),
        });
        assert!(matches!(err, CoreError::Api { status: Some(403), .. }));
    }

    #[test]
    fn patch_errors_name_the_field() {
        let err = CoreError::from(tailbar_api::Error::UnsupportedField("Hostname".into()));
        assert!(matches!(err, CoreError::UnsupportedField { ref field } if field == "Hostname"));
    }
}
