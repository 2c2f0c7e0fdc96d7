// ── API-to-domain conversions ──
//
// Bridges `tailbar_api` wire types into the domain model. The status
// document and the watch bus describe peers with different field sets;
// both must land in the same `RawPeer` shape so the catalog cannot tell
// which source a peer came from.

use tailbar_api::models::{GeoLocation, NetmapPeer, PeerStatus, Prefs};

use crate::model::{GeoInfo, RawPeer, RawPrefs};

/// Routes whose presence in `AllowedIPs` marks an exit node.
const DEFAULT_ROUTES: [&str; 2] = ["0.0.0.0/0", "::/0"];

/// Context needed to classify peers.
#[derive(Debug, Clone, Default)]
pub struct PeerContext<'a> {
    /// DNS suffixes that identify commercial provider nodes.
    pub provider_domains: &'a [String],
}

impl PeerContext<'_> {
    fn is_provider(&self, dns_name: &str, location: Option<&GeoInfo>) -> bool {
        location.is_some()
            || self.provider_domains.iter().any(|domain| {
                let domain = domain.trim_matches('.');
                !domain.is_empty()
                    && (dns_name.eq_ignore_ascii_case(domain)
                        || dns_name
                            .to_ascii_lowercase()
                            .ends_with(&format!(".{}", domain.to_ascii_lowercase())))
            })
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn advertises_default_route(allowed: Option<&Vec<String>>) -> bool {
    allowed.is_some_and(|ips| ips.iter().any(|ip| DEFAULT_ROUTES.contains(&ip.as_str())))
}

fn normalize_dns_name(name: &str) -> String {
    name.trim_end_matches('.').to_owned()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}

impl From<&GeoLocation> for GeoInfo {
    fn from(geo: &GeoLocation) -> Self {
        Self {
            country: geo.country.clone(),
            country_code: geo.country_code.clone(),
            city: geo.city.clone(),
            priority: geo.priority,
        }
    }
}

// ── Peers ──────────────────────────────────────────────────────────

/// Normalize a peer from the status document.
pub fn peer_from_status(peer: &PeerStatus, ctx: &PeerContext<'_>) -> RawPeer {
    let dns_name = if peer.dns_name.is_empty() {
        peer.host_name.clone()
    } else {
        normalize_dns_name(&peer.dns_name)
    };
    let location = peer.location.as_ref().map(GeoInfo::from);

    RawPeer {
        id: peer.id.clone(),
        provider: ctx.is_provider(&dns_name, location.as_ref()),
        dns_name,
        os: peer.os.clone(),
        online: peer.online,
        ips: peer.tailscale_ips.clone().unwrap_or_default(),
        exit_node_option: peer.exit_node_option
            || advertises_default_route(peer.allowed_ips.as_ref()),
        location,
    }
}

/// Normalize a peer from a network-map record.
pub fn peer_from_netmap(peer: &NetmapPeer, ctx: &PeerContext<'_>) -> RawPeer {
    let hostinfo = peer.hostinfo.as_ref();
    let dns_name = if peer.name.is_empty() {
        hostinfo.map(|h| h.hostname.clone()).unwrap_or_default()
    } else {
        normalize_dns_name(&peer.name)
    };
    let location = hostinfo
        .and_then(|h| h.location.as_ref())
        .map(GeoInfo::from);

    RawPeer {
        id: peer.stable_id.clone(),
        provider: ctx.is_provider(&dns_name, location.as_ref()),
        dns_name,
        os: hostinfo.map(|h| h.os.clone()).unwrap_or_default(),
        online: peer.online.unwrap_or(false),
        ips: peer
            .addresses
            .iter()
            .flatten()
            .map(|addr| strip_host_prefix(addr).to_owned())
            .collect(),
        exit_node_option: advertises_default_route(peer.allowed_ips.as_ref()),
        location,
    }
}

/// Network maps list addresses as single-host prefixes (`100.64.0.1/32`).
fn strip_host_prefix(addr: &str) -> &str {
    match addr.split_once('/') {
        Some((ip, "32" | "128")) => ip,
        _ => addr,
    }
}

// ── Prefs ──────────────────────────────────────────────────────────

impl From<&Prefs> for RawPrefs {
    fn from(prefs: &Prefs) -> Self {
        Self {
            want_running: prefs.want_running,
            accept_dns: prefs.corp_dns,
            accept_routes: prefs.route_all,
            allow_lan_access: prefs.exit_node_allow_lan_access,
            shields_up: prefs.shields_up,
            ssh: prefs.run_ssh,
            exit_node_id: non_empty(&prefs.exit_node_id),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn domains() -> Vec<String> {
        vec!["mullvad.ts.net".into()]
    }

    #[test]
    fn status_and_netmap_peers_normalize_identically() {
        let status: PeerStatus = serde_json::from_value(json!({
            "ID": "nAbC",
            "HostName": "se-got-wg-001",
            "DNSName": "se-got-wg-001.mullvad.ts.net.",
            "OS": "linux",
            "TailscaleIPs": ["100.100.1.1"],
            "AllowedIPs": ["100.100.1.1/32", "0.0.0.0/0", "::/0"],
            "Online": true,
            "Location": {"Country": "Sweden", "CountryCode": "SE", "City": "Gothenburg", "Priority": 10}
        }))
        .unwrap();
        let netmap: NetmapPeer = serde_json::from_value(json!({
            "ID": 12345,
            "StableID": "nAbC",
            "Name": "se-got-wg-001.mullvad.ts.net.",
            "Addresses": ["100.100.1.1/32"],
            "AllowedIPs": ["100.100.1.1/32", "0.0.0.0/0", "::/0"],
            "Online": true,
            "Hostinfo": {
                "OS": "linux",
                "Hostname": "se-got-wg-001",
                "Location": {"Country": "Sweden", "CountryCode": "SE", "City": "Gothenburg", "Priority": 10}
            }
        }))
        .unwrap();

        let domains = domains();
        let ctx = PeerContext {
            provider_domains: &domains,
        };
        let a = peer_from_status(&status, &ctx);
        let b = peer_from_netmap(&netmap, &ctx);

        assert_eq!(a, b);
        assert_eq!(a.dns_name, "se-got-wg-001.mullvad.ts.net");
        assert!(a.exit_node_option);
        assert!(a.provider);
        assert_eq!(a.location.unwrap().priority, Some(10));
    }

    #[test]
    fn exit_eligibility_needs_a_default_route() {
        let ctx = PeerContext::default();
        let peer: NetmapPeer = serde_json::from_value(json!({
            "StableID": "n1",
            "Name": "nas.tail.ts.net.",
            "AllowedIPs": ["100.64.0.2/32", "192.168.1.0/24"]
        }))
        .unwrap();
        let raw = peer_from_netmap(&peer, &ctx);
        assert!(!raw.exit_node_option);
        assert!(!raw.online);
        assert!(!raw.provider);
    }

    #[test]
    fn provider_matched_by_domain_suffix() {
        let domains = domains();
        let ctx = PeerContext {
            provider_domains: &domains,
        };
        assert!(ctx.is_provider("us-nyc-wg-301.mullvad.ts.net", None));
        assert!(ctx.is_provider("US-NYC-WG-301.Mullvad.ts.net", None));
        assert!(!ctx.is_provider("notmullvad.ts.net", None));
        assert!(!ctx.is_provider("laptop.tail1234.ts.net", None));
    }

    #[test]
    fn empty_exit_node_id_means_none() {
        let prefs: Prefs = serde_json::from_value(json!({"ExitNodeID": "", "CorpDNS": true})).unwrap();
        let raw = RawPrefs::from(&prefs);
        assert_eq!(raw.exit_node_id, None);
        assert!(raw.accept_dns);

        let prefs: Prefs = serde_json::from_value(json!({"ExitNodeID": "n9"})).unwrap();
        assert_eq!(RawPrefs::from(&prefs).exit_node_id.as_deref(), Some("n9"));
    }
}
