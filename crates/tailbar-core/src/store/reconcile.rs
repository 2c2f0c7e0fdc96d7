// ── Merging daemon data into canonical state ──
//
// Keeps the last raw status, prefs and peer set the daemon reported and
// re-derives every property after each merge. The store's equality gate
// decides what actually gets announced.

use std::sync::Arc;

use tracing::{debug, warn};

use tailbar_api::models::{BackendState, IpnStatus, Notify, Prefs};

use super::property::Property;
use super::state_store::StateStore;
use crate::catalog;
use crate::convert::{self, PeerContext};
use crate::model::{RawPeer, RawPrefs};

/// Raw daemon data plus the rules for projecting it onto a store.
#[derive(Debug, Default)]
pub(crate) struct Reconciler {
    backend: Option<BackendState>,
    prefs: Option<RawPrefs>,
    peers: Option<Vec<RawPeer>>,
    provider_domains: Vec<String>,
}

impl Reconciler {
    pub(crate) fn new(provider_domains: Vec<String>) -> Self {
        Self {
            provider_domains,
            ..Self::default()
        }
    }

    fn context(&self) -> PeerContext<'_> {
        PeerContext {
            provider_domains: &self.provider_domains,
        }
    }

    // ── Inputs ───────────────────────────────────────────────────────

    /// Replace everything with a fresh status + prefs pair.
    pub(crate) fn apply_snapshot(&mut self, store: &StateStore, status: &IpnStatus, prefs: &Prefs) {
        self.prefs = Some(RawPrefs::from(prefs));
        self.apply_status(store, status);
        store.mark_snapshot();
    }

    /// Merge a status document: backend state and the full peer map.
    pub(crate) fn apply_status(&mut self, store: &StateStore, status: &IpnStatus) {
        self.backend = Some(BackendState::from_name(&status.backend_state));
        let ctx = self.context();
        let peers = status
            .peer
            .iter()
            .flat_map(|map| map.values())
            .map(|p| convert::peer_from_status(p, &ctx))
            .collect();
        self.peers = Some(peers);
        self.publish_all(store);
    }

    /// Merge a preferences document, e.g. the echo of a write.
    pub(crate) fn apply_prefs(&mut self, store: &StateStore, prefs: &Prefs) {
        self.prefs = Some(RawPrefs::from(prefs));
        self.publish_all(store);
    }

    /// Merge one watch-bus record. Unrecognized content is ignored.
    pub(crate) fn apply_notify(&mut self, store: &StateStore, notify: &Notify) {
        if let Some(message) = &notify.err_message {
            warn!(message = %message, "daemon reported an error");
        }

        let mut touched = false;
        if let Some(code) = notify.state {
            match BackendState::from_code(code) {
                Some(state) => {
                    debug!(%state, "backend state");
                    self.backend = Some(state);
                    touched = true;
                }
                None => warn!(code, "unknown backend state"),
            }
        }
        if let Some(prefs) = &notify.prefs {
            self.prefs = Some(RawPrefs::from(prefs));
            touched = true;
        }
        if let Some(netmap) = &notify.net_map {
            let ctx = self.context();
            let peers = netmap
                .peers
                .iter()
                .flatten()
                .map(|p| convert::peer_from_netmap(p, &ctx))
                .collect();
            self.peers = Some(peers);
            touched = true;
        }

        if touched {
            self.publish_all(store);
            store.mark_update();
        }
    }

    /// The daemon is gone: forget its backend state.
    pub(crate) fn mark_down(&mut self, store: &StateStore) {
        self.backend = None;
        self.publish_all(store);
    }

    // ── Derivation ───────────────────────────────────────────────────

    fn running(&self) -> bool {
        self.backend.is_some_and(BackendState::is_running)
            && self.prefs.as_ref().is_none_or(|p| p.want_running)
    }

    fn publish_all(&self, store: &StateStore) {
        store.publish(Property::Running(self.running()));

        if let Some(prefs) = &self.prefs {
            store.publish(Property::AcceptDns(prefs.accept_dns));
            store.publish(Property::AcceptRoutes(prefs.accept_routes));
            store.publish(Property::AllowLanAccess(prefs.allow_lan_access));
            store.publish(Property::ShieldsUp(prefs.shields_up));
            store.publish(Property::Ssh(prefs.ssh));
            store.publish(Property::ExitNode(prefs.exit_node_id.clone()));
        }

        let nodes = match (&self.peers, &self.prefs) {
            (Some(peers), Some(prefs)) => Some(Arc::new(catalog::derive(peers, prefs))),
            _ => None,
        };
        store.publish(Property::Nodes(nodes));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::PropertyName;
    use serde_json::json;
    use tokio::sync::broadcast;

    fn drain(rx: &mut broadcast::Receiver<Property>) -> Vec<PropertyName> {
        let mut names = Vec::new();
        while let Ok(p) = rx.try_recv() {
            names.push(p.name());
        }
        names
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(vec!["mullvad.ts.net".into()])
    }

    #[test]
    fn status_without_prefs_leaves_nodes_undefined() {
        let store = StateStore::new();
        let mut rx = store.subscribe_changes();
        let mut rec = reconciler();

        let status: IpnStatus = serde_json::from_value(json!({
            "BackendState": "NeedsLogin",
            "Peer": {"k": {"ID": "n1", "DNSName": "a.ts.net.", "Online": true}}
        }))
        .unwrap();
        rec.apply_status(&store, &status);

        assert!(!store.running().get());
        assert!(store.nodes().get().is_none());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn netmap_only_record_derives_nodes_online_first() {
        let store = StateStore::new();
        let mut rec = reconciler();
        rec.apply_prefs(&store, &Prefs::default());

        let notify: Notify = serde_json::from_value(json!({
            "NetMap": {"Peers": [
                {"StableID": "off", "Name": "aaa.tail.ts.net.", "Online": false},
                {"StableID": "on", "Name": "zzz.tail.ts.net.", "Online": true,
                 "AllowedIPs": ["0.0.0.0/0", "::/0"]}
            ]}
        }))
        .unwrap();
        rec.apply_notify(&store, &notify);

        let nodes = store.nodes().get().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id, "on");
        assert!(nodes[0].can_be_exit_node);
        assert!(store.last_update().is_some());
    }

    #[test]
    fn running_needs_backend_and_want_running() {
        let store = StateStore::new();
        let mut rec = reconciler();

        rec.apply_notify(&store, &serde_json::from_value(json!({"State": 6})).unwrap());
        assert!(store.running().get());

        let prefs: Prefs = serde_json::from_value(json!({"WantRunning": false})).unwrap();
        rec.apply_prefs(&store, &prefs);
        assert!(!store.running().get());

        let prefs: Prefs = serde_json::from_value(json!({"WantRunning": true})).unwrap();
        rec.apply_prefs(&store, &prefs);
        assert!(store.running().get());

        rec.mark_down(&store);
        assert!(!store.running().get());
    }

    #[test]
    fn identical_record_twice_notifies_once() {
        let store = StateStore::new();
        let mut rx = store.subscribe_changes();
        let mut rec = reconciler();

        let notify: Notify = serde_json::from_value(json!({
            "Prefs": {"ShieldsUp": true, "WantRunning": true},
            "NetMap": {"Peers": [{"StableID": "x", "Name": "x.ts.net.", "Online": true}]}
        }))
        .unwrap();

        rec.apply_notify(&store, &notify);
        let first = drain(&mut rx);
        assert!(first.contains(&PropertyName::ShieldsUp));
        assert!(first.contains(&PropertyName::Nodes));

        rec.apply_notify(&store, &notify);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn exit_node_follows_prefs_and_marks_one_node() {
        let store = StateStore::new();
        let mut rec = reconciler();
        let status: IpnStatus = serde_json::from_value(json!({
            "BackendState": "Running",
            "Peer": {
                "a": {"ID": "n1", "DNSName": "one.ts.net.", "Online": true, "ExitNodeOption": true},
                "b": {"ID": "n2", "DNSName": "two.ts.net.", "Online": true, "ExitNodeOption": true}
            }
        }))
        .unwrap();
        let prefs: Prefs =
            serde_json::from_value(json!({"ExitNodeID": "n2", "WantRunning": true})).unwrap();

        rec.apply_snapshot(&store, &status, &prefs);

        assert_eq!(store.exit_node().get().as_deref(), Some("n2"));
        let nodes = store.nodes().get().unwrap();
        let current: Vec<_> = nodes.iter().filter(|n| n.is_current_exit_node).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].id, "n2");
        assert!(store.last_snapshot().is_some());
    }
}
