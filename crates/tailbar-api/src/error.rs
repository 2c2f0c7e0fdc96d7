use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the `tailbar-api` crate.
///
/// Covers every failure mode of the local API: reaching the socket,
/// the HTTP exchange itself, decoding bodies, and building preference
/// patches. `tailbar-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Could not open the daemon's socket (missing, refused, permissions).
    #[error("Cannot reach daemon socket {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP-level failure on an open connection.
    #[error("HTTP transport error: {0}")]
    Http(#[from] hyper::Error),

    /// The request could not be constructed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The daemon answered with a non-success status.
    #[error("Daemon returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// A streaming response was cut off mid-record.
    #[error("Stream dropped: {0}")]
    StreamDropped(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON was declared but the body did not decode, with the raw body
    /// for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Preferences ─────────────────────────────────────────────────
    /// A preference patch named a field the daemon does not accept.
    #[error("Unsupported preference field: {0}")]
    UnsupportedField(String),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connect { .. } | Self::Timeout { .. } | Self::StreamDropped(_) => true,
            Self::Http(e) => e.is_closed() || e.is_incomplete_message(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the body arrived but could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Deserialization { .. })
    }

    /// HTTP status code, if the daemon answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_errors_are_transient() {
        let err = Error::Connect {
            path: PathBuf::from("/run/missing.sock"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.is_transient());
        assert!(!err.is_decode());
        assert!(err.to_string().contains("/run/missing.sock"));
    }

    #[test]
    fn client_errors_are_not_transient() {
        let err = Error::Status {
            status: 403,
            message: "access denied".into(),
        };
        assert!(!err.is_transient());
        assert_eq!(err.status(), Some(403));

        let err = Error::Status {
            status: 503,
            message: "starting".into(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn unsupported_field_message_names_the_field() {
        let err = Error::UnsupportedField("Hostname".into());
        assert_eq!(err.to_string(), "Unsupported preference field: Hostname");
    }
}
