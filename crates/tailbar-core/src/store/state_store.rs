// ── Canonical property store ──
//
// One observable per exposed property, plus a broadcast feed that carries
// every change. Written only by the engine task; read from anywhere.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch};

use super::property::Property;
use crate::model::Node;
use crate::observable::Observable;

const CHANGE_CHANNEL_SIZE: usize = 256;

/// The engine's change-notified view of the daemon.
pub struct StateStore {
    running: Observable<bool>,
    accept_dns: Observable<bool>,
    accept_routes: Observable<bool>,
    allow_lan_access: Observable<bool>,
    shields_up: Observable<bool>,
    ssh: Observable<bool>,
    exit_node: Observable<Option<String>>,
    nodes: Observable<Option<Arc<Vec<Node>>>>,
    changes: broadcast::Sender<Property>,
    last_snapshot: watch::Sender<Option<DateTime<Utc>>>,
    last_update: watch::Sender<Option<DateTime<Utc>>>,
}

/// Point-in-time copy of every property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalState {
    pub running: bool,
    pub accept_dns: bool,
    pub accept_routes: bool,
    pub allow_lan_access: bool,
    pub shields_up: bool,
    pub ssh: bool,
    pub exit_node: Option<String>,
    pub nodes: Option<Arc<Vec<Node>>>,
}

impl StateStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_SIZE);
        let (last_snapshot, _) = watch::channel(None);
        let (last_update, _) = watch::channel(None);

        Self {
            running: Observable::new(false),
            accept_dns: Observable::new(false),
            accept_routes: Observable::new(false),
            allow_lan_access: Observable::new(false),
            shields_up: Observable::new(false),
            ssh: Observable::new(false),
            exit_node: Observable::new(None),
            nodes: Observable::new(None),
            changes,
            last_snapshot,
            last_update,
        }
    }

    // ── Observables ──────────────────────────────────────────────────

    pub fn running(&self) -> &Observable<bool> {
        &self.running
    }

    pub fn accept_dns(&self) -> &Observable<bool> {
        &self.accept_dns
    }

    pub fn accept_routes(&self) -> &Observable<bool> {
        &self.accept_routes
    }

    pub fn allow_lan_access(&self) -> &Observable<bool> {
        &self.allow_lan_access
    }

    pub fn shields_up(&self) -> &Observable<bool> {
        &self.shields_up
    }

    pub fn ssh(&self) -> &Observable<bool> {
        &self.ssh
    }

    /// Stable ID of the active exit node.
    pub fn exit_node(&self) -> &Observable<Option<String>> {
        &self.exit_node
    }

    /// The node catalog; `None` until both peers and prefs have arrived.
    pub fn nodes(&self) -> &Observable<Option<Arc<Vec<Node>>>> {
        &self.nodes
    }

    /// Copy every property at once.
    pub fn current(&self) -> CanonicalState {
        CanonicalState {
            running: self.running.get(),
            accept_dns: self.accept_dns.get(),
            accept_routes: self.accept_routes.get(),
            allow_lan_access: self.allow_lan_access.get(),
            shields_up: self.shields_up.get(),
            ssh: self.ssh.get(),
            exit_node: self.exit_node.get(),
            nodes: self.nodes.get(),
        }
    }

    /// Look up a catalog node by stable ID.
    pub fn node_by_id(&self, id: &str) -> Option<Node> {
        self.nodes
            .get()
            .and_then(|nodes| nodes.iter().find(|n| n.id == id).cloned())
    }

    // ── Change feed ──────────────────────────────────────────────────

    /// Every property change, in the order it was applied.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<Property> {
        self.changes.subscribe()
    }

    /// Store a property value; broadcast it if it changed.
    pub(crate) fn publish(&self, property: Property) -> bool {
        let changed = match &property {
            Property::Running(v) => self.running.set(*v),
            Property::AcceptDns(v) => self.accept_dns.set(*v),
            Property::AcceptRoutes(v) => self.accept_routes.set(*v),
            Property::AllowLanAccess(v) => self.allow_lan_access.set(*v),
            Property::ShieldsUp(v) => self.shields_up.set(*v),
            Property::Ssh(v) => self.ssh.set(*v),
            Property::ExitNode(v) => self.exit_node.set(v.clone()),
            Property::Nodes(v) => self.nodes.set(v.clone()),
        };
        if changed {
            let _ = self.changes.send(property);
        }
        changed
    }

    pub(crate) fn clear_listeners(&self) {
        self.running.clear_listeners();
        self.accept_dns.clear_listeners();
        self.accept_routes.clear_listeners();
        self.allow_lan_access.clear_listeners();
        self.shields_up.clear_listeners();
        self.ssh.clear_listeners();
        self.exit_node.clear_listeners();
        self.nodes.clear_listeners();
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub(crate) fn mark_snapshot(&self) {
        let now = Utc::now();
        let _ = self.last_snapshot.send_replace(Some(now));
        let _ = self.last_update.send_replace(Some(now));
    }

    pub(crate) fn mark_update(&self) {
        let _ = self.last_update.send_replace(Some(Utc::now()));
    }

    pub fn last_snapshot(&self) -> Option<DateTime<Utc>> {
        *self.last_snapshot.borrow()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.borrow()
    }

    /// Time since the daemon last told us anything, or `None` if never.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.last_update().map(|t| Utc::now() - t)
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn publish_broadcasts_only_changes() {
        let store = StateStore::new();
        let mut rx = store.subscribe_changes();

        assert!(store.publish(Property::ShieldsUp(true)));
        assert!(!store.publish(Property::ShieldsUp(true)));
        assert!(!store.publish(Property::Ssh(false)));

        assert_eq!(rx.try_recv().unwrap(), Property::ShieldsUp(true));
        assert!(rx.try_recv().is_err());
        assert!(store.current().shields_up);
    }

    #[test]
    fn timestamps_start_empty() {
        let store = StateStore::new();
        assert!(store.last_snapshot().is_none());
        assert!(store.data_age().is_none());

        store.mark_snapshot();
        assert!(store.last_snapshot().is_some());
        assert_eq!(store.last_snapshot(), store.last_update());
    }
}
