// ── Runtime engine configuration ──
//
// Describes *how* to reach the daemon and how the sync loop behaves.
// Plain data: the CLI constructs an `EngineConfig` and hands it in; core
// never touches disk.

use std::path::PathBuf;
use std::time::Duration;

use tailbar_api::TransportConfig;
use tailbar_api::transport::DEFAULT_SOCKET_PATH;

/// Fixed delay between a lost connection and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// DNS suffix of the default commercial exit-node provider.
pub const DEFAULT_PROVIDER_DOMAIN: &str = "mullvad.ts.net";

/// Configuration for one engine talking to one daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// The daemon's local API socket.
    pub socket_path: PathBuf,
    /// Timeout for request/response exchanges. Streams are not limited.
    pub timeout: Duration,
    /// Backoff before reconnecting. Fixed, never grows.
    pub reconnect_delay: Duration,
    /// Peers under these DNS suffixes are treated as provider nodes.
    pub provider_domains: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            timeout: Duration::from_secs(30),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            provider_domains: vec![DEFAULT_PROVIDER_DOMAIN.to_owned()],
        }
    }
}

impl EngineConfig {
    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig::new(&self.socket_path).with_timeout(self.timeout)
    }
}
