//! Clap derive structures for the `tailbar` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use tailbar_core::Flag;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tailbar -- status, toggles and exit nodes for a local Tailscale daemon
#[derive(Debug, Parser)]
#[command(
    name = "tailbar",
    version,
    about = "Control the local Tailscale daemon from the command line",
    long_about = "Talks to the Tailscale daemon (tailscaled) over its local API socket.\n\n\
        Shows connection state and peers, flips preference toggles,\n\
        and picks exit nodes by location.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Daemon socket path (overrides config)
    #[arg(long, env = "TAILBAR_SOCKET", global = true)]
    pub socket: Option<PathBuf>,

    /// Request timeout in seconds (overrides config)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TAILBAR_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show connection state and preference toggles
    #[command(alias = "st")]
    Status,

    /// List peers, online and exit-capable first
    #[command(alias = "n")]
    Nodes(NodesArgs),

    /// Turn a preference toggle on or off
    Set(SetArgs),

    /// Browse and choose exit nodes
    #[command(alias = "exit", alias = "x")]
    ExitNode(ExitNodeArgs),

    /// Follow property changes until interrupted
    Watch,

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Nodes ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NodesArgs {
    /// Only show online nodes
    #[arg(long)]
    pub online: bool,

    /// Only show nodes that can act as an exit node
    #[arg(long)]
    pub exit_capable: bool,
}

// ── Set ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Toggle to change
    pub flag: FlagArg,

    /// New value
    pub value: Switch,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FlagArg {
    Running,
    AcceptDns,
    AcceptRoutes,
    AllowLanAccess,
    ShieldsUp,
    Ssh,
}

impl From<FlagArg> for Flag {
    fn from(arg: FlagArg) -> Self {
        match arg {
            FlagArg::Running => Flag::Running,
            FlagArg::AcceptDns => Flag::AcceptDns,
            FlagArg::AcceptRoutes => Flag::AcceptRoutes,
            FlagArg::AllowLanAccess => Flag::AllowLanAccess,
            FlagArg::ShieldsUp => Flag::ShieldsUp,
            FlagArg::Ssh => Flag::Ssh,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    #[value(alias = "true", alias = "1")]
    On,
    #[value(alias = "false", alias = "0")]
    Off,
}

impl From<Switch> for bool {
    fn from(s: Switch) -> Self {
        s == Switch::On
    }
}

// ── Exit node ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ExitNodeArgs {
    #[command(subcommand)]
    pub command: ExitNodeCommand,
}

#[derive(Debug, Subcommand)]
pub enum ExitNodeCommand {
    /// List provider locations
    #[command(alias = "ls")]
    List {
        /// Filter by city or country (case-insensitive substring)
        #[arg(long, short = 's')]
        search: Option<String>,
    },

    /// Show the online nodes of one location, best first
    Show {
        /// City or country of the location
        location: String,
    },

    /// Route traffic through a node, or through a location's best node
    Use {
        /// Node stable ID, or a city / country name
        target: String,
    },

    /// Stop using an exit node
    Clear,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
