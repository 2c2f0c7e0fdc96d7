// ── Node catalog ──
//
// Pure derivation of the ordered node list from raw peers and prefs.
// The order is part of the contract: online first, then exit-capable,
// then by name.

use std::cmp::Ordering;

use crate::model::{Node, RawPeer, RawPrefs};

/// Project and order every peer.
///
/// Total and side-effect free: equal inputs always produce equal output,
/// which is what lets the store suppress redundant notifications.
pub fn derive(peers: &[RawPeer], prefs: &RawPrefs) -> Vec<Node> {
    let mut nodes: Vec<Node> = peers.iter().map(|p| Node::project(p, prefs)).collect();
    nodes.sort_by(catalog_cmp);
    nodes
}

fn catalog_cmp(a: &Node, b: &Node) -> Ordering {
    b.online
        .cmp(&a.online)
        .then_with(|| b.can_be_exit_node.cmp(&a.can_be_exit_node))
        .then_with(|| locale_cmp(&a.name, &b.name))
}

/// Human-friendly string order.
///
/// Letters compare case-insensitively first so `alpha` and `Beta` sort
/// the way a reader expects; ties fall back to lowercase-before-uppercase
/// and finally to the raw string so the order stays total.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));

    folded
        .then_with(|| {
            a.chars()
                .zip(b.chars())
                .map(|(x, y)| case_rank(x).cmp(&case_rank(y)))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.cmp(b))
}

fn case_rank(c: char) -> u8 {
    u8::from(c.is_uppercase())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn peer(id: &str, name: &str, online: bool, exit: bool) -> RawPeer {
        RawPeer {
            id: id.into(),
            dns_name: format!("{name}.tail1234.ts.net"),
            os: "linux".into(),
            online,
            exit_node_option: exit,
            ..RawPeer::default()
        }
    }

    fn names(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn online_then_exit_capable_then_name() {
        let peers = vec![
            peer("1", "zeta", false, true),
            peer("2", "delta", true, false),
            peer("3", "bravo", true, true),
            peer("4", "alpha", false, false),
            peer("5", "charlie", true, false),
            peer("6", "echo", true, true),
        ];
        let nodes = derive(&peers, &RawPrefs::default());
        assert_eq!(
            names(&nodes),
            vec!["bravo", "echo", "charlie", "delta", "zeta", "alpha"]
        );
    }

    #[test]
    fn no_offline_node_precedes_an_online_one() {
        let peers: Vec<RawPeer> = (0..20)
            .map(|i| peer(&i.to_string(), &format!("host{}", 20 - i), i % 3 == 0, i % 2 == 0))
            .collect();
        let nodes = derive(&peers, &RawPrefs::default());

        let first_offline = nodes.iter().position(|n| !n.online).unwrap();
        assert!(nodes[first_offline..].iter().all(|n| !n.online));

        for pair in nodes.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.online == b.online && a.can_be_exit_node == b.can_be_exit_node {
                assert_ne!(locale_cmp(&a.name, &b.name), Ordering::Greater);
            }
        }
    }

    #[test]
    fn derive_is_deterministic() {
        let peers = vec![peer("a", "one", true, false), peer("b", "two", false, true)];
        let prefs = RawPrefs {
            exit_node_id: Some("b".into()),
            ..RawPrefs::default()
        };
        let first = derive(&peers, &prefs);
        let second = derive(&peers, &prefs);
        assert_eq!(first, second);
        assert_eq!(first.iter().filter(|n| n.is_current_exit_node).count(), 1);
    }

    #[test]
    fn locale_order_ignores_case_first() {
        let mut names = vec!["beta", "Alpha", "alpha", "Gamma", "delta"];
        names.sort_by(|a, b| locale_cmp(a, b));
        assert_eq!(names, vec!["alpha", "Alpha", "beta", "delta", "Gamma"]);
    }
}
