//! Shared configuration for tailbar front ends.
//!
//! A small TOML file merged with `TAILBAR_*` environment variables, and
//! its translation to `tailbar_core::EngineConfig`. The CLI layers its
//! own flag overrides on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tailbar_core::{DEFAULT_PROVIDER_DOMAIN, DEFAULT_RECONNECT_DELAY, EngineConfig};

const ENV_PREFIX: &str = "TAILBAR_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Path to the daemon's local API socket.
    #[serde(default = "default_socket")]
    pub socket: PathBuf,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Delay before reconnecting after the daemon goes away.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// DNS suffixes whose peers count as provider exit nodes.
    #[serde(default = "default_provider_domains")]
    pub provider_domains: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: default_socket(),
            timeout: default_timeout(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            provider_domains: default_provider_domains(),
        }
    }
}

fn default_socket() -> PathBuf {
    EngineConfig::default().socket_path
}
fn default_timeout() -> u64 {
    30
}
fn default_reconnect_delay_ms() -> u64 {
    u64::try_from(DEFAULT_RECONNECT_DELAY.as_millis()).unwrap_or(5000)
}
fn default_provider_domains() -> Vec<String> {
    vec![DEFAULT_PROVIDER_DOMAIN.into()]
}

impl Config {
    /// Validate and convert into the engine's runtime configuration.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        if self.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "timeout".into(),
                reason: "must be at least one second".into(),
            });
        }
        if self.socket.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                field: "socket".into(),
                reason: "path is empty".into(),
            });
        }

        let provider_domains = self
            .provider_domains
            .iter()
            .map(|d| d.trim().trim_matches('.').to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        Ok(EngineConfig {
            socket_path: self.socket.clone(),
            timeout: Duration::from_secs(self.timeout),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            provider_domains,
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "tailbar", "tailbar").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tailbar");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path, still honouring the environment.
/// A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it can't be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    fn load(path: &str) -> Result<Config, figment::Error> {
        load_config_from(Path::new(path)).map_err(|e| figment::Error::from(e.to_string()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_| {
            let config = load("absent.toml")?;
            assert_eq!(config, Config::default());
            assert_eq!(config.reconnect_delay_ms, 5000);
            assert_eq!(config.provider_domains, vec!["mullvad.ts.net".to_owned()]);
            Ok(())
        });
    }

    #[test]
    fn file_overrides_defaults_and_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    socket = "/tmp/alt.sock"
                    timeout = 5
                    provider_domains = ["example.ts.net"]
                "#,
            )?;
            jail.set_env("TAILBAR_TIMEOUT", "12");

            let config = load("config.toml")?;
            assert_eq!(config.socket, PathBuf::from("/tmp/alt.sock"));
            assert_eq!(config.timeout, 12);
            assert_eq!(config.reconnect_delay_ms, 5000);
            assert_eq!(config.provider_domains, vec!["example.ts.net".to_owned()]);
            Ok(())
        });
    }

    #[test]
    fn engine_config_normalizes_domains() {
        let config = Config {
            provider_domains: vec![".Mullvad.TS.net.".into(), "  ".into()],
            reconnect_delay_ms: 250,
            ..Config::default()
        };
        let engine = config.to_engine_config().unwrap();
        assert_eq!(engine.provider_domains, vec!["mullvad.ts.net".to_owned()]);
        assert_eq!(engine.reconnect_delay, Duration::from_millis(250));
        assert_eq!(engine.timeout, Duration::from_secs(30));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = Config {
            timeout: 0,
            ..Config::default()
        };
        let err = config.to_engine_config().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "timeout"));
    }

    #[test]
    fn saved_config_loads_back() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("nested").join("config.toml");
            let config = Config {
                timeout: 7,
                ..Config::default()
            };
            save_config_to(&config, &path).map_err(|e| e.to_string())?;

            let loaded = load(path.to_str().unwrap())?;
            assert_eq!(loaded, config);
            Ok(())
        });
    }
}
