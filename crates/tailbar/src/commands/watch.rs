//! `tailbar watch`: follow property changes until Ctrl-C.

use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use tailbar_core::{DaemonApi, EngineConfig, Phase, Property, SyncEngine};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// One line of text output for a change.
fn describe(property: &Property, color: bool) -> String {
    let name = property.name();
    match property {
        Property::Running(v)
        | Property::AcceptDns(v)
        | Property::AcceptRoutes(v)
        | Property::AllowLanAccess(v)
        | Property::ShieldsUp(v)
        | Property::Ssh(v) => format!("{name}: {}", output::on_off(*v, color)),
        Property::ExitNode(id) => format!("{name}: {}", id.as_deref().unwrap_or("-")),
        Property::Nodes(None) => format!("{name}: -"),
        Property::Nodes(Some(nodes)) => {
            let online = nodes.iter().filter(|n| n.online).count();
            format!("{name}: {} ({online} online)", nodes.len())
        }
    }
}

fn render(property: &Property, global: &GlobalOpts, color: bool) -> Result<String, CliError> {
    match global.output {
        // One JSON document per line keeps the output streamable.
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            serde_json::to_string(property).map_err(|e| CliError::Render(e.to_string()))
        }
        OutputFormat::Table | OutputFormat::Plain => Ok(describe(property, color)),
    }
}

pub async fn handle(config: EngineConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let engine = SyncEngine::new(config);
    let color = output::should_color(global.color);

    follow(&engine, global.quiet, |property| {
        output::print_output(&render(property, global, color)?, global.quiet);
        Ok(())
    })
    .await
}

/// Run `engine` and hand every change to `emit` until Ctrl-C or the first
/// emit failure. The engine is disposed either way.
async fn follow<A: DaemonApi>(
    engine: &SyncEngine<A>,
    quiet: bool,
    mut emit: impl FnMut(&Property) -> Result<(), CliError>,
) -> Result<(), CliError> {
    let mut changes = engine.changes();
    let mut phase = engine.phase();

    engine.start().await?;

    let result = loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break Ok(()),
            change = changes.recv() => match change {
                Ok(property) => {
                    if let Err(e) = emit(&property) {
                        break Err(e);
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "change feed lagged"),
                Err(RecvError::Closed) => break Ok(()),
            },
            changed = phase.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = *phase.borrow_and_update();
                if current == Phase::Backoff {
                    if let Some(err) = engine.last_error() {
                        warn!(error = %err, "daemon unavailable, retrying");
                    }
                }
                if !quiet {
                    eprintln!("phase: {current}");
                }
            }
        }
    };

    engine.dispose().await;
    result
}
