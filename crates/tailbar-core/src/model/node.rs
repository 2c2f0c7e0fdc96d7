// ── Node view model ──

use serde::Serialize;
use strum::{Display, IntoStaticStr};

use super::peer::{GeoInfo, RawPeer, RawPrefs};

/// Icon category for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NodeIcon {
    Offline,
    Mobile,
    Desktop,
}

impl NodeIcon {
    fn for_peer(online: bool, os: &str) -> Self {
        if !online {
            Self::Offline
        } else if os.eq_ignore_ascii_case("android") || os.eq_ignore_ascii_case("ios") {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }
}

/// One entry of the node catalog.
///
/// Derived from a [`RawPeer`] plus the current preferences; recomputed on
/// every change and compared structurally to decide whether to notify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub id: String,
    /// First label of the DNS name.
    pub name: String,
    pub os: String,
    pub icon: NodeIcon,
    pub online: bool,
    pub is_current_exit_node: bool,
    pub can_be_exit_node: bool,
    pub ips: Vec<String>,
    pub provider: bool,
    pub location: Option<GeoInfo>,
}

impl Node {
    pub(crate) fn project(peer: &RawPeer, prefs: &RawPrefs) -> Self {
        Self {
            id: peer.id.clone(),
            name: display_name(&peer.dns_name).to_owned(),
            os: peer.os.clone(),
            icon: NodeIcon::for_peer(peer.online, &peer.os),
            online: peer.online,
            is_current_exit_node: prefs.exit_node_id.as_deref() == Some(peer.id.as_str()),
            can_be_exit_node: peer.exit_node_option,
            ips: peer.ips.clone(),
            provider: peer.provider,
            location: peer.location.clone(),
        }
    }

    /// The address to hand out when someone asks for "the" IP of a node.
    pub fn primary_ip(&self) -> Option<&str> {
        self.ips.first().map(String::as_str)
    }

    /// Provider rank, if any.
    pub fn priority(&self) -> Option<i64> {
        self.location.as_ref().and_then(|l| l.priority)
    }
}

fn display_name(dns_name: &str) -> &str {
    dns_name.split('.').next().unwrap_or(dns_name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn peer(os: &str, online: bool) -> RawPeer {
        RawPeer {
            id: "n1".into(),
            dns_name: "pixel-7.tail1234.ts.net".into(),
            os: os.into(),
            online,
            ips: vec!["100.64.0.7".into(), "fd7a:115c:a1e0::7".into()],
            ..RawPeer::default()
        }
    }

    #[test]
    fn icon_follows_presence_then_platform() {
        let prefs = RawPrefs::default();
        assert_eq!(Node::project(&peer("android", false), &prefs).icon, NodeIcon::Offline);
        assert_eq!(Node::project(&peer("android", true), &prefs).icon, NodeIcon::Mobile);
        assert_eq!(Node::project(&peer("iOS", true), &prefs).icon, NodeIcon::Mobile);
        assert_eq!(Node::project(&peer("linux", true), &prefs).icon, NodeIcon::Desktop);
    }

    #[test]
    fn name_is_first_dns_label() {
        let node = Node::project(&peer("linux", true), &RawPrefs::default());
        assert_eq!(node.name, "pixel-7");
        assert_eq!(node.primary_ip(), Some("100.64.0.7"));
    }

    #[test]
    fn current_exit_node_matches_prefs_id() {
        let mut prefs = RawPrefs::default();
        assert!(!Node::project(&peer("linux", true), &prefs).is_current_exit_node);

        prefs.exit_node_id = Some("n1".into());
        assert!(Node::project(&peer("linux", true), &prefs).is_current_exit_node);
    }
}
