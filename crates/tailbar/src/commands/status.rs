//! `tailbar status`: one snapshot of the canonical properties.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tailbar_core::{EngineConfig, Node, SyncEngine};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct StatusView {
    running: bool,
    accept_dns: bool,
    accept_routes: bool,
    allow_lan_access: bool,
    shields_up: bool,
    ssh: bool,
    exit_node: Option<String>,
    exit_node_name: Option<String>,
    nodes_online: usize,
    nodes_total: usize,
    last_snapshot: Option<DateTime<Utc>>,
}

impl StatusView {
    fn capture(engine: &SyncEngine) -> Self {
        let state = engine.store().current();
        let nodes: &[Node] = state.nodes.as_deref().map(Vec::as_slice).unwrap_or_default();
        let exit_node_name = nodes
            .iter()
            .find(|n| n.is_current_exit_node)
            .map(|n| n.name.clone());

        Self {
            running: state.running,
            accept_dns: state.accept_dns,
            accept_routes: state.accept_routes,
            allow_lan_access: state.allow_lan_access,
            shields_up: state.shields_up,
            ssh: state.ssh,
            exit_node: state.exit_node,
            exit_node_name,
            nodes_online: nodes.iter().filter(|n| n.online).count(),
            nodes_total: nodes.len(),
            last_snapshot: engine.store().last_snapshot(),
        }
    }
}

fn detail(s: &StatusView, color: bool) -> String {
    let exit = match (&s.exit_node_name, &s.exit_node) {
        (Some(name), Some(id)) => format!("{name} ({id})"),
        (None, Some(id)) => id.clone(),
        _ => "-".into(),
    };
    [
        format!("Running:          {}", output::on_off(s.running, color)),
        format!("Accept DNS:       {}", output::on_off(s.accept_dns, color)),
        format!("Accept routes:    {}", output::on_off(s.accept_routes, color)),
        format!("Allow LAN access: {}", output::on_off(s.allow_lan_access, color)),
        format!("Shields up:       {}", output::on_off(s.shields_up, color)),
        format!("SSH:              {}", output::on_off(s.ssh, color)),
        format!("Exit node:        {exit}"),
        format!("Nodes:            {}/{} online", s.nodes_online, s.nodes_total),
    ]
    .join("\n")
}

pub async fn handle(config: EngineConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let view = SyncEngine::oneshot(config, |engine| async move {
        Ok::<_, CliError>(StatusView::capture(&engine))
    })
    .await?;

    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        &view,
        |s| detail(s, color),
        |s| if s.running { "running".into() } else { "stopped".into() },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
