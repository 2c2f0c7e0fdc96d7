// ── Domain model ──
//
// Canonical, UI-agnostic representation of the daemon's peers and
// preferences. Raw types mirror what the daemon reported; view types are
// derived from them and never stored on their own.

pub mod location;
pub mod node;
pub mod peer;

// ── Re-exports ──────────────────────────────────────────────────────

pub use location::{CatalogEntry, Location};
pub use node::{Node, NodeIcon};
pub use peer::{GeoInfo, RawPeer, RawPrefs};
