//! `tailbar set <flag> <on|off>`.

use serde::Serialize;

use tailbar_core::{Command, CommandResult, EngineConfig, Flag, SyncEngine};

use crate::cli::{GlobalOpts, SetArgs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct SetOutcome {
    flag: String,
    value: bool,
    changed: bool,
}

pub async fn handle(config: EngineConfig, args: SetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let flag = Flag::from(args.flag);
    let value = bool::from(args.value);

    let outcome = SyncEngine::oneshot(config, |engine| async move {
        let result = engine.execute(Command::SetFlag { flag, value }).await?;
        Ok::<_, CliError>(SetOutcome {
            flag: flag.to_string(),
            // The daemon's echo, which may differ from what was asked.
            value: flag.current(engine.store()),
            changed: result == CommandResult::Applied,
        })
    })
    .await?;

    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        &outcome,
        |o| format!("{}: {}", o.flag, output::on_off(o.value, color)),
        |o| output::on_off(o.value, false),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
