//! `tailbar exit-node`: provider locations and exit-node selection.

use serde::Serialize;
use tabled::Tabled;

use tailbar_core::{
    CoreError, EngineConfig, ExitNodePicker, ExitNodeSelector, Location, Node, SyncEngine,
};

use crate::cli::{ExitNodeArgs, ExitNodeCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct LocationRow {
    #[tabled(rename = "")]
    flag: String,
    #[tabled(rename = "City")]
    city: String,
    #[tabled(rename = "Country")]
    country: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Best node")]
    best: String,
    #[tabled(rename = "Active")]
    active: String,
}

impl LocationRow {
    fn new(l: &Location, exit_node: Option<&str>) -> Self {
        Self {
            flag: l.flag(),
            city: l.city.clone(),
            country: l.country.clone(),
            online: format!("{}/{}", l.online_count, l.nodes.len()),
            best: l.best_node.name.clone(),
            active: if l.is_current(exit_node) { "*" } else { "" }.into(),
        }
    }
}

#[derive(Tabled)]
struct MemberRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Active")]
    active: String,
}

impl From<&Node> for MemberRow {
    fn from(n: &Node) -> Self {
        Self {
            id: n.id.clone(),
            name: n.name.clone(),
            priority: n.priority().map(|p| p.to_string()).unwrap_or_default(),
            active: if n.is_current_exit_node { "*" } else { "" }.into(),
        }
    }
}

/// Result of a `use` or `clear`.
#[derive(Debug, Serialize)]
struct Selection {
    exit_node: Option<String>,
    name: Option<String>,
    city: Option<String>,
    country: Option<String>,
}

impl Selection {
    fn from_node(node: Option<&Node>) -> Self {
        let geo = node.and_then(|n| n.location.as_ref());
        Self {
            exit_node: node.map(|n| n.id.clone()),
            name: node.map(|n| n.name.clone()),
            city: geo.map(|g| g.city.clone()),
            country: geo.map(|g| g.country.clone()),
        }
    }

    fn describe(&self) -> String {
        match (&self.name, &self.city, &self.country) {
            (Some(name), Some(city), Some(country)) => {
                format!("Exit node: {name} ({city}, {country})")
            }
            (Some(name), ..) => format!("Exit node: {name}"),
            _ => "Exit node cleared".into(),
        }
    }
}

// ── Resolution ──────────────────────────────────────────────────────

/// Pick the location a user meant: an exact city or country name first,
/// then the first substring match in display order.
fn resolve_location<'a>(locations: &'a [Location], query: &str) -> Option<&'a Location> {
    locations
        .iter()
        .find(|l| l.city.eq_ignore_ascii_case(query) || l.country.eq_ignore_ascii_case(query))
        .or_else(|| locations.iter().find(|l| l.matches(query)))
}

fn find_node<'a>(nodes: &'a [Node], target: &str) -> Option<&'a Node> {
    nodes
        .iter()
        .find(|n| n.id == target)
        .or_else(|| nodes.iter().find(|n| n.name.eq_ignore_ascii_case(target)))
}

/// Resolve `target` through the picker: a node stands for itself, a
/// location for its best node.
fn pick(engine: &SyncEngine, target: &str, picker: &mut ExitNodePicker) -> Result<(), CliError> {
    let nodes = engine.nodes().unwrap_or_default();
    let locations = engine.exit_node_locations("");

    if let Some(node) = find_node(&nodes, target) {
        if !node.can_be_exit_node {
            return Err(CliError::Validation {
                field: "target".into(),
                reason: format!("{} does not offer itself as an exit node", node.name),
            });
        }
        match locations.iter().find(|l| l.nodes.iter().any(|m| m.id == node.id)) {
            Some(location) => {
                picker.expand(location);
                picker.select_node(&node.id)?;
            }
            // Personal exit nodes are not grouped; treat the node as a
            // location of its own.
            None => {
                let own = ExitNodeSelector::group_by_location(std::slice::from_ref(node));
                if let Some(location) = own.values().next() {
                    picker.select_location(location);
                }
            }
        }
        return Ok(());
    }

    let location = resolve_location(&locations, target).ok_or_else(|| {
        CliError::from(CoreError::LocationNotFound {
            query: target.into(),
        })
    })?;
    picker.select_location(location);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: EngineConfig,
    args: ExitNodeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ExitNodeCommand::List { search } => {
            let (locations, current) = SyncEngine::oneshot(config, |engine| async move {
                let query = search.as_deref().unwrap_or_default();
                Ok::<_, CliError>((engine.exit_node_locations(query), engine.exit_node()))
            })
            .await?;

            let out = output::render_list(
                global.output,
                &locations,
                |l| LocationRow::new(l, current.as_deref()),
                |l| format!("{}, {}", l.city, l.country),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ExitNodeCommand::Show { location } => {
            let members = SyncEngine::oneshot(config, |engine| async move {
                let locations = engine.exit_node_locations("");
                let found = resolve_location(&locations, &location).ok_or_else(|| {
                    CliError::from(CoreError::LocationNotFound {
                        query: location.clone(),
                    })
                })?;
                Ok::<_, CliError>(ExitNodePicker::new().expand(found))
            })
            .await?;

            let out = output::render_list(
                global.output,
                &members,
                |n| MemberRow::from(n),
                |n| n.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ExitNodeCommand::Use { target } => {
            let selection = SyncEngine::oneshot(config, |engine| async move {
                let mut picker = ExitNodePicker::new();
                pick(&engine, &target, &mut picker)?;
                engine.commit_selection(&mut picker).await?;

                // Report what the daemon actually settled on.
                let current = engine
                    .exit_node()
                    .and_then(|id| engine.store().node_by_id(&id));
                Ok::<_, CliError>(Selection::from_node(current.as_ref()))
            })
            .await?;
            print_selection(&selection, global)
        }

        ExitNodeCommand::Clear => {
            let selection = SyncEngine::oneshot(config, |engine| async move {
                engine.set_exit_node(None).await?;
                Ok::<_, CliError>(Selection::from_node(None))
            })
            .await?;
            print_selection(&selection, global)
        }
    }
}

fn print_selection(selection: &Selection, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(
        global.output,
        selection,
        Selection::describe,
        |s| s.exit_node.clone().unwrap_or_default(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
