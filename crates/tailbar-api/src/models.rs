// Local API wire types
//
// Serde models for the daemon's status, preferences and watch-bus
// documents. The daemon emits PascalCase keys with a handful of
// upper-case acronyms, so those fields carry explicit renames. Fields use
// `#[serde(default)]` liberally because the daemon omits zero values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

// ── Prefs ────────────────────────────────────────────────────────────

/// Preference document from `GET /localapi/v0/prefs`.
///
/// Only the flags the client reads are modelled; everything else the
/// daemon sends is preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefs {
    #[serde(rename = "ControlURL")]
    pub control_url: String,
    #[serde(rename = "RouteAll")]
    pub route_all: bool,
    #[serde(rename = "ExitNodeID")]
    pub exit_node_id: String,
    #[serde(rename = "ExitNodeIP")]
    pub exit_node_ip: String,
    #[serde(rename = "ExitNodeAllowLANAccess")]
    pub exit_node_allow_lan_access: bool,
    #[serde(rename = "CorpDNS")]
    pub corp_dns: bool,
    #[serde(rename = "RunSSH")]
    pub run_ssh: bool,
    #[serde(rename = "WantRunning")]
    pub want_running: bool,
    #[serde(rename = "ShieldsUp")]
    pub shields_up: bool,
    #[serde(rename = "Hostname")]
    pub hostname: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ── Status ───────────────────────────────────────────────────────────

/// Status document from `GET /localapi/v0/status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct IpnStatus {
    pub version: String,
    pub backend_state: String,
    #[serde(rename = "Self")]
    pub self_node: Option<PeerStatus>,
    #[serde(rename = "MagicDNSSuffix")]
    pub magic_dns_suffix: String,
    /// Keyed by node public key. Absent when the daemon is logged out.
    pub peer: Option<BTreeMap<String, PeerStatus>>,
}

/// One peer entry of the status document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerStatus {
    /// Stable node ID, the value `ExitNodeID` refers to.
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "PublicKey")]
    pub public_key: String,
    #[serde(rename = "HostName")]
    pub host_name: String,
    #[serde(rename = "DNSName")]
    pub dns_name: String,
    #[serde(rename = "OS")]
    pub os: String,
    #[serde(rename = "TailscaleIPs")]
    pub tailscale_ips: Option<Vec<String>>,
    #[serde(rename = "AllowedIPs")]
    pub allowed_ips: Option<Vec<String>>,
    #[serde(rename = "Online")]
    pub online: bool,
    /// This peer is the current exit node.
    #[serde(rename = "ExitNode")]
    pub exit_node: bool,
    /// This peer offers itself as an exit node.
    #[serde(rename = "ExitNodeOption")]
    pub exit_node_option: bool,
    #[serde(rename = "Location")]
    pub location: Option<GeoLocation>,
}

/// Geographic metadata the daemon attaches to provider exit nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GeoLocation {
    pub country: String,
    pub country_code: String,
    pub city: String,
    pub city_code: String,
    /// Lower is better. Absent on nodes without a provider ranking.
    pub priority: Option<i64>,
}

// ── Watch bus ────────────────────────────────────────────────────────

/// One record of the `watch-ipn-bus` stream.
///
/// Every field is optional; a record carries only what changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Notify {
    pub version: Option<String>,
    pub err_message: Option<String>,
    /// Numeric backend state, see [`BackendState::from_code`].
    pub state: Option<i64>,
    pub prefs: Option<Prefs>,
    pub net_map: Option<NetMap>,
}

/// Network map fragment of a watch record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct NetMap {
    pub self_node: Option<NetmapPeer>,
    /// Full replacement of the peer set.
    pub peers: Option<Vec<NetmapPeer>>,
}

/// A peer as it appears inside a network map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetmapPeer {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "StableID")]
    pub stable_id: String,
    /// Fully-qualified DNS name, usually with a trailing dot.
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Addresses")]
    pub addresses: Option<Vec<String>>,
    #[serde(rename = "AllowedIPs")]
    pub allowed_ips: Option<Vec<String>>,
    /// Unknown when the control plane has not reported presence.
    #[serde(rename = "Online")]
    pub online: Option<bool>,
    #[serde(rename = "Hostinfo")]
    pub hostinfo: Option<Hostinfo>,
}

/// Host details reported by a peer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hostinfo {
    #[serde(rename = "OS")]
    pub os: String,
    #[serde(rename = "Hostname")]
    pub hostname: String,
    #[serde(rename = "Location")]
    pub location: Option<GeoLocation>,
}

// ── Backend state ────────────────────────────────────────────────────

/// The daemon's backend state machine.
///
/// The status document reports it by name, the watch bus by number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum BackendState {
    NoState,
    InUseOtherUser,
    NeedsLogin,
    NeedsMachineAuth,
    Stopped,
    Starting,
    Running,
}

impl BackendState {
    /// Map the watch bus's numeric state. Unknown codes yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => Self::NoState,
            1 => Self::InUseOtherUser,
            2 => Self::NeedsLogin,
            3 => Self::NeedsMachineAuth,
            4 => Self::Stopped,
            5 => Self::Starting,
            6 => Self::Running,
            _ => return None,
        })
    }

    /// Parse the status document's name, treating anything unknown as
    /// `NoState`.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or(Self::NoState)
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}
