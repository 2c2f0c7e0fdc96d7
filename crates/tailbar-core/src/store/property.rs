use std::sync::Arc;

use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::model::Node;

/// Names of the canonical properties.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr, Serialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum PropertyName {
    Running,
    AcceptDns,
    AcceptRoutes,
    AllowLanAccess,
    ShieldsUp,
    Ssh,
    ExitNode,
    Nodes,
}

/// A property's new value, as published on the change feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "property", content = "value", rename_all = "kebab-case")]
pub enum Property {
    Running(bool),
    AcceptDns(bool),
    AcceptRoutes(bool),
    AllowLanAccess(bool),
    ShieldsUp(bool),
    Ssh(bool),
    ExitNode(Option<String>),
    Nodes(Option<Arc<Vec<Node>>>),
}

impl Property {
    pub fn name(&self) -> PropertyName {
        match self {
            Self::Running(_) => PropertyName::Running,
            Self::AcceptDns(_) => PropertyName::AcceptDns,
            Self::AcceptRoutes(_) => PropertyName::AcceptRoutes,
            Self::AllowLanAccess(_) => PropertyName::AllowLanAccess,
            Self::ShieldsUp(_) => PropertyName::ShieldsUp,
            Self::Ssh(_) => PropertyName::Ssh,
            Self::ExitNode(_) => PropertyName::ExitNode,
            Self::Nodes(_) => PropertyName::Nodes,
        }
    }
}
