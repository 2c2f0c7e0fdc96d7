//! Command handlers: bridge CLI args -> engine operations -> output formatting.

pub mod config_cmd;
pub mod exit_node;
pub mod nodes;
pub mod set;
pub mod status;
pub mod watch;
