// ── Provider locations ──

use serde::Serialize;

use super::node::Node;

/// Provider exit nodes that share a city and country.
///
/// Built by [`crate::exit_node::ExitNodeSelector`]; members keep the
/// catalog's order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub city: String,
    pub country: String,
    pub country_code: String,
    pub nodes: Vec<Node>,
    pub online_count: usize,
    pub best_node: Node,
}

impl Location {
    /// Regional-indicator flag for the country code, or an empty string.
    pub fn flag(&self) -> String {
        country_flag(&self.country_code)
    }

    /// Whether the active exit node is this location's best node.
    pub fn is_current(&self, exit_node_id: Option<&str>) -> bool {
        exit_node_id == Some(self.best_node.id.as_str())
    }

    /// Online members, best first. This is what an expanded location shows.
    pub fn online_nodes(&self) -> Vec<&Node> {
        let mut online: Vec<&Node> = self.nodes.iter().filter(|n| n.online).collect();
        online.sort_by(|a, b| crate::exit_node::priority_cmp(a, b));
        online
    }

    /// Case-insensitive match on city or country.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.city.to_lowercase().contains(&query) || self.country.to_lowercase().contains(&query)
    }
}

/// One selectable row of the exit-node catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CatalogEntry {
    Location(Location),
    Node(Node),
}

impl CatalogEntry {
    /// Node a selection of this entry resolves to.
    pub fn target(&self) -> &Node {
        match self {
            Self::Location(location) => &location.best_node,
            Self::Node(node) => node,
        }
    }
}

fn country_flag(code: &str) -> String {
    const REGIONAL_INDICATOR_OFFSET: u32 = 0x1F1E6 - 'A' as u32;

    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return String::new();
    }
    code.chars()
        .filter_map(|c| char::from_u32(c.to_ascii_uppercase() as u32 + REGIONAL_INDICATOR_OFFSET))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::NodeIcon;

    fn node(id: &str) -> Node {
        Node {
            id: id.into(),
            name: id.into(),
            os: "linux".into(),
            icon: NodeIcon::Desktop,
            online: true,
            is_current_exit_node: false,
            can_be_exit_node: true,
            ips: Vec::new(),
            provider: true,
            location: None,
        }
    }

    fn location(code: &str) -> Location {
        Location {
            city: "Gothenburg".into(),
            country: "Sweden".into(),
            country_code: code.into(),
            nodes: vec![node("se-got-1")],
            online_count: 1,
            best_node: node("se-got-1"),
        }
    }

    #[test]
    fn flag_from_country_code() {
        assert_eq!(location("SE").flag(), "\u{1F1F8}\u{1F1EA}");
        assert_eq!(location("se").flag(), "\u{1F1F8}\u{1F1EA}");
        assert_eq!(location("").flag(), "");
        assert_eq!(location("SWE").flag(), "");
        assert_eq!(location("1A").flag(), "");
    }

    #[test]
    fn current_when_best_node_is_exit_node() {
        let loc = location("SE");
        assert!(loc.is_current(Some("se-got-1")));
        assert!(!loc.is_current(Some("other")));
        assert!(!loc.is_current(None));
    }

    #[test]
    fn query_matches_city_or_country() {
        let loc = location("SE");
        assert!(loc.matches("goth"));
        assert!(loc.matches("SWED"));
        assert!(loc.matches(""));
        assert!(!loc.matches("norway"));
    }

    #[test]
    fn entry_target_resolves_location_to_best_node() {
        let entry = CatalogEntry::Location(location("SE"));
        assert_eq!(entry.target().id, "se-got-1");
        let entry = CatalogEntry::Node(node("x"));
        assert_eq!(entry.target().id, "x");
    }
}
