// ── Exit-node selection ──
//
// Location grouping for provider nodes and the picker state machine that
// turns a location or node choice into a single exit-node write.

mod picker;
mod selector;

use std::cmp::Ordering;

use crate::model::Node;

pub use picker::{ExitNodePicker, PickerState};
pub use selector::{ExitNodeSelector, LocationKey, UNKNOWN};

/// Order by provider priority, lowest first, with unranked nodes last.
///
/// Equal ranks compare equal so a stable sort keeps catalog order.
pub fn priority_cmp(a: &Node, b: &Node) -> Ordering {
    match (a.priority(), b.priority()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
