mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need the daemon
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "tailbar", &mut std::io::stdout());
            Ok(())
        }

        // Everything else talks to the daemon
        Command::Status => {
            let engine_config = config::engine_config(&cli.global)?;
            commands::status::handle(engine_config, &cli.global).await
        }
        Command::Nodes(args) => {
            let engine_config = config::engine_config(&cli.global)?;
            commands::nodes::handle(engine_config, args, &cli.global).await
        }
        Command::Set(args) => {
            let engine_config = config::engine_config(&cli.global)?;
            commands::set::handle(engine_config, args, &cli.global).await
        }
        Command::ExitNode(args) => {
            let engine_config = config::engine_config(&cli.global)?;
            commands::exit_node::handle(engine_config, args, &cli.global).await
        }
        Command::Watch => {
            let engine_config = config::engine_config(&cli.global)?;
            commands::watch::handle(engine_config, &cli.global).await
        }
    }
}
