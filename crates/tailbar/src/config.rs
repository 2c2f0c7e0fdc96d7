//! CLI-specific configuration: `tailbar-config` file + env, then flags.

use tailbar_config::Config;
use tailbar_core::EngineConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use tailbar_config::{config_path, load_config, save_config};

/// Load the config file and apply `--socket` / `--timeout` on top.
pub fn resolve(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = load_config()?;
    apply_overrides(&mut cfg, global);
    Ok(cfg)
}

/// The engine configuration for this invocation.
pub fn engine_config(global: &GlobalOpts) -> Result<EngineConfig, CliError> {
    Ok(resolve(global)?.to_engine_config()?)
}

fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(socket) = &global.socket {
        cfg.socket.clone_from(socket);
    }
    if let Some(timeout) = global.timeout {
        cfg.timeout = timeout;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    #[test]
    fn flags_override_file_values() {
        let cli = Cli::try_parse_from([
            "tailbar",
            "--socket",
            "/run/alt.sock",
            "--timeout",
            "3",
            "status",
        ])
        .unwrap();
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, &cli.global);

        assert_eq!(cfg.socket, PathBuf::from("/run/alt.sock"));
        assert_eq!(cfg.timeout, 3);
        assert_eq!(cfg.reconnect_delay_ms, Config::default().reconnect_delay_ms);
    }

    #[test]
    fn absent_flags_keep_file_values() {
        let cli = Cli::try_parse_from(["tailbar", "nodes"]).unwrap();
        let mut cfg = Config {
            timeout: 9,
            ..Config::default()
        };
        apply_overrides(&mut cfg, &cli.global);
        assert_eq!(cfg.timeout, 9);
    }
}
