// ── Canonical state ──
//
// Change-notified properties, the raw daemon data they are derived from,
// and the merge logic that turns snapshots and stream records into
// property updates.

mod property;
mod reconcile;
mod state_store;

pub use property::{Property, PropertyName};
pub(crate) use reconcile::Reconciler;
pub use state_store::{CanonicalState, StateStore};
