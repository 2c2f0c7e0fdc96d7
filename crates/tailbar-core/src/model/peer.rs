// ── Daemon-reported data ──

use serde::Serialize;

/// Geographic metadata attached to provider exit nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeoInfo {
    pub country: String,
    pub country_code: String,
    pub city: String,
    /// Provider-assigned rank, lower is better. `None` ranks last.
    pub priority: Option<i64>,
}

/// A peer as the daemon reported it.
///
/// The status document and the watch bus describe peers differently; both
/// are normalized into this shape (see [`crate::convert`]). Replaced
/// wholesale on every snapshot or network-map update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawPeer {
    /// Stable node ID, compared against [`RawPrefs::exit_node_id`].
    pub id: String,
    /// Fully-qualified DNS name without the trailing dot.
    pub dns_name: String,
    pub os: String,
    pub online: bool,
    pub ips: Vec<String>,
    /// Advertises the default route, so it can act as an exit node.
    pub exit_node_option: bool,
    pub location: Option<GeoInfo>,
    /// Belongs to a commercial exit-node provider rather than the tailnet.
    pub provider: bool,
}

/// The preference flags the engine tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawPrefs {
    pub want_running: bool,
    pub accept_dns: bool,
    pub accept_routes: bool,
    pub allow_lan_access: bool,
    pub shields_up: bool,
    pub ssh: bool,
    /// Stable ID of the selected exit node, `None` when unset.
    pub exit_node_id: Option<String>,
}
