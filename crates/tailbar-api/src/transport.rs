// Shared transport configuration and connection setup for the local API.
//
// The daemon listens on a filesystem socket and speaks HTTP/1.1 rooted at
// a fixed virtual host. Every exchange opens its own connection; the
// socket is local so there is nothing worth pooling.

use std::path::PathBuf;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::client::conn::http1::SendRequest;
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tracing::{debug, warn};

use crate::error::Error;

/// Virtual host every local API request is addressed to.
pub const LOCAL_API_HOST: &str = "local-tailscaled.sock";

/// Socket the daemon listens on in a stock Linux install.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/tailscale/tailscaled.sock";

/// Shared transport configuration for building connections.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub socket_path: PathBuf,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Open the socket and complete the HTTP/1.1 handshake.
    ///
    /// The connection driver is spawned onto the runtime and lives until
    /// the returned sender (and any response body it produced) is dropped.
    pub(crate) async fn connect(&self) -> Result<SendRequest<Full<Bytes>>, Error> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| Error::Connect {
                path: self.socket_path.clone(),
                source,
            })?;

        let io = TokioIo::new(stream);
        let (sender, conn) = hyper::client::conn::http1::handshake(io).await?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                warn!(error = %e, "local API connection error");
            }
        });

        debug!(socket = %self.socket_path.display(), "connected to daemon socket");
        Ok(sender)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_system_socket() {
        let config = TransportConfig::default();
        assert_eq!(config.socket_path, PathBuf::from(DEFAULT_SOCKET_PATH));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn builder_overrides_timeout_only() {
        let config = TransportConfig::new("/tmp/ts.sock").with_timeout(Duration::from_secs(2));
        assert_eq!(config.socket_path, PathBuf::from("/tmp/ts.sock"));
        assert_eq!(config.timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn connect_to_missing_socket_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = TransportConfig::new(dir.path().join("absent.sock"));

        let err = config.connect().await.unwrap_err();
        assert!(matches!(err, Error::Connect { .. }));
        assert!(err.is_transient());
    }
}
