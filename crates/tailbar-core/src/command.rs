// ── Command API ──
//
// All write operations flow through a unified `Command` enum. The engine
// task executes them one at a time, so writes never interleave with each
// other or with stream merges.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tokio::sync::oneshot;

use tailbar_api::PrefField;

use crate::error::CoreError;
use crate::store::StateStore;

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// Boolean preferences exposed as canonical properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Flag {
    Running,
    AcceptDns,
    AcceptRoutes,
    AllowLanAccess,
    ShieldsUp,
    Ssh,
}

impl Flag {
    /// Preference field a write to this flag patches.
    pub fn pref_field(self) -> PrefField {
        match self {
            Self::Running => PrefField::WantRunning,
            Self::AcceptDns => PrefField::CorpDns,
            Self::AcceptRoutes => PrefField::RouteAll,
            Self::AllowLanAccess => PrefField::ExitNodeAllowLanAccess,
            Self::ShieldsUp => PrefField::ShieldsUp,
            Self::Ssh => PrefField::RunSsh,
        }
    }

    /// Cached value of this flag.
    pub fn current(self, store: &StateStore) -> bool {
        match self {
            Self::Running => store.running().get(),
            Self::AcceptDns => store.accept_dns().get(),
            Self::AcceptRoutes => store.accept_routes().get(),
            Self::AllowLanAccess => store.allow_lan_access().get(),
            Self::ShieldsUp => store.shields_up().get(),
            Self::Ssh => store.ssh().get(),
        }
    }
}

/// All write operations against the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetFlag { flag: Flag, value: bool },
    /// `None` clears the exit node.
    SetExitNode(Option<String>),
    /// Clear when `node_id` is already the exit node, select it otherwise.
    ToggleExitNode(String),
}

/// Result of a command execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// The cached value already matched; nothing was sent.
    Unchanged,
    /// The daemon accepted the patch and its echo was merged.
    Applied,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn flags_parse_from_kebab_case() {
        assert_eq!("shields-up".parse::<Flag>().unwrap(), Flag::ShieldsUp);
        assert_eq!("allow-lan-access".parse::<Flag>().unwrap(), Flag::AllowLanAccess);
        assert!("hostname".parse::<Flag>().is_err());
    }

    #[test]
    fn every_flag_has_a_distinct_field() {
        let mut fields: Vec<&str> = Flag::iter().map(|f| f.pref_field().wire_name()).collect();
        fields.sort_unstable();
        fields.dedup();
        assert_eq!(fields.len(), Flag::iter().count());
        assert!(!fields.contains(&PrefField::ExitNodeId.wire_name()));
    }
}
