use crate::error::CoreError;
use crate::model::{CatalogEntry, Location, Node};

/// Where the picker currently is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PickerState {
    #[default]
    Collapsed,
    /// One location is open, showing its online members.
    Expanded(Location),
    /// A node was chosen and is waiting to be written.
    NodeSelected(Node),
}

/// Selection state machine for the provider location list.
///
/// Choosing a location or a node inside the expanded location both end in
/// [`PickerState::NodeSelected`]. [`take_selection`](Self::take_selection)
/// hands that node to the writer and returns the picker to `Collapsed`.
#[derive(Debug, Clone, Default)]
pub struct ExitNodePicker {
    state: PickerState,
}

impl ExitNodePicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PickerState {
        &self.state
    }

    /// Open `location` and return its online members, best first.
    ///
    /// Expanding the location that is already open closes it again.
    pub fn expand(&mut self, location: &Location) -> Vec<Node> {
        if matches!(&self.state, PickerState::Expanded(open) if same_location(open, location)) {
            self.state = PickerState::Collapsed;
            return Vec::new();
        }
        let members = location.online_nodes().into_iter().cloned().collect();
        self.state = PickerState::Expanded(location.clone());
        members
    }

    pub fn collapse(&mut self) {
        self.state = PickerState::Collapsed;
    }

    /// Choose a location directly; resolves to its best node.
    pub fn select_location(&mut self, location: &Location) -> Node {
        self.state = PickerState::NodeSelected(location.best_node.clone());
        location.best_node.clone()
    }

    /// Choose an online member of the expanded location.
    pub fn select_node(&mut self, node_id: &str) -> Result<Node, CoreError> {
        let PickerState::Expanded(location) = &self.state else {
            return Err(CoreError::ValidationFailed {
                message: "no location is expanded".into(),
            });
        };
        let node = location
            .online_nodes()
            .into_iter()
            .find(|n| n.id == node_id)
            .cloned()
            .ok_or_else(|| CoreError::NodeNotFound {
                identifier: node_id.to_owned(),
            })?;

        self.state = PickerState::NodeSelected(node.clone());
        Ok(node)
    }

    /// Hand out the pending selection and collapse.
    pub fn take_selection(&mut self) -> Option<Node> {
        match std::mem::take(&mut self.state) {
            PickerState::NodeSelected(node) => Some(node),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Rows to display: every location, with the expanded one followed by
    /// its online members.
    pub fn entries(&self, locations: &[Location]) -> Vec<CatalogEntry> {
        let mut rows = Vec::with_capacity(locations.len());
        for location in locations {
            rows.push(CatalogEntry::Location(location.clone()));
            if let PickerState::Expanded(open) = &self.state {
                if same_location(open, location) {
                    rows.extend(
                        location
                            .online_nodes()
                            .into_iter()
                            .cloned()
                            .map(CatalogEntry::Node),
                    );
                }
            }
        }
        rows
    }
}

fn same_location(a: &Location, b: &Location) -> bool {
    a.city == b.city && a.country == b.country
}
