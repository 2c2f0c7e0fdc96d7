//! `tailbar nodes`: the node catalog.

use tabled::Tabled;

use tailbar_core::{EngineConfig, Node, SyncEngine};

use crate::cli::{GlobalOpts, NodesArgs};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "OS")]
    os: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Exit")]
    exit: String,
    #[tabled(rename = "Location")]
    location: String,
}

impl From<&Node> for NodeRow {
    fn from(n: &Node) -> Self {
        let exit = if n.is_current_exit_node {
            "current"
        } else if n.can_be_exit_node {
            "yes"
        } else {
            ""
        };
        Self {
            id: n.id.clone(),
            name: n.name.clone(),
            os: n.os.clone(),
            ip: n.primary_ip().unwrap_or("-").to_owned(),
            status: if n.online { "online" } else { "offline" }.into(),
            exit: exit.into(),
            location: n
                .location
                .as_ref()
                .map(|g| format!("{}, {}", g.city, g.country))
                .unwrap_or_default(),
        }
    }
}

fn keep(n: &Node, args: &NodesArgs) -> bool {
    (!args.online || n.online) && (!args.exit_capable || n.can_be_exit_node)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: EngineConfig,
    args: NodesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let nodes = SyncEngine::oneshot(config, |engine| async move {
        Ok::<_, CliError>(engine.nodes().unwrap_or_default())
    })
    .await?;

    let shown: Vec<Node> = nodes.iter().filter(|n| keep(n, &args)).cloned().collect();
    let out = output::render_list(global.output, &shown, |n| NodeRow::from(n), |n| n.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
