use indexmap::IndexMap;

use super::priority_cmp;
use crate::catalog::locale_cmp;
use crate::model::{Location, Node};

/// Placeholder for a missing city or country.
pub const UNKNOWN: &str = "Unknown";

/// Grouping key: `(city, country)`.
pub type LocationKey = (String, String);

/// Derived-data operations over provider exit nodes. No I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExitNodeSelector;

impl ExitNodeSelector {
    /// Group nodes by city and country, in first-seen order.
    ///
    /// Missing values collapse into an [`UNKNOWN`] bucket so every node
    /// lands in exactly one group. Groups without any online member are
    /// still returned here; [`locations`](Self::locations) drops them.
    pub fn group_by_location(nodes: &[Node]) -> IndexMap<LocationKey, Location> {
        let mut members: IndexMap<LocationKey, (String, Vec<Node>)> = IndexMap::new();

        for node in nodes {
            let geo = node.location.as_ref();
            let city = geo.map_or("", |g| g.city.as_str());
            let country = geo.map_or("", |g| g.country.as_str());
            let key = (or_unknown(city), or_unknown(country));

            let entry = members
                .entry(key)
                .or_insert_with(|| (geo.map(|g| g.country_code.clone()).unwrap_or_default(), Vec::new()));
            entry.1.push(node.clone());
        }

        members
            .into_iter()
            .filter_map(|((city, country), (country_code, nodes))| {
                let best_node = Self::best_node(&nodes)?.clone();
                let online_count = nodes.iter().filter(|n| n.online).count();
                let location = Location {
                    city: city.clone(),
                    country: country.clone(),
                    country_code,
                    nodes,
                    online_count,
                    best_node,
                };
                Some(((city, country), location))
            })
            .collect()
    }

    /// Lowest-priority online member; ties go to the earlier node.
    ///
    /// Falls back to the first member when nobody is online so a group is
    /// never empty. Only an empty slice yields `None`.
    pub fn best_node(nodes: &[Node]) -> Option<&Node> {
        nodes
            .iter()
            .filter(|n| n.online)
            .reduce(|best, n| if priority_cmp(n, best).is_lt() { n } else { best })
            .or_else(|| nodes.first())
    }

    /// Keep locations whose city or country contains `query`, ignoring case.
    ///
    /// Only the empty string is the identity; whitespace is searched for.
    pub fn filter(locations: Vec<Location>, query: &str) -> Vec<Location> {
        if query.is_empty() {
            return locations;
        }
        locations.into_iter().filter(|l| l.matches(query)).collect()
    }

    /// Order by country, then city.
    pub fn sort(mut locations: Vec<Location>) -> Vec<Location> {
        locations.sort_by(|a, b| {
            locale_cmp(&a.country, &b.country).then_with(|| locale_cmp(&a.city, &b.city))
        });
        locations
    }

    /// Full pipeline from catalog output to the selectable location list.
    pub fn locations(nodes: &[Node], query: &str) -> Vec<Location> {
        let providers: Vec<Node> = nodes.iter().filter(|n| n.provider).cloned().collect();
        let selectable = Self::group_by_location(&providers)
            .into_values()
            .filter(|l| l.online_count > 0)
            .collect();
        Self::sort(Self::filter(selectable, query))
    }
}

fn or_unknown(value: &str) -> String {
    if value.is_empty() {
        UNKNOWN.to_owned()
    } else {
        value.to_owned()
    }
}
