// tailbar-core: Reactive state engine between tailbar-api and consumers (CLI, menus).

pub mod catalog;
pub mod command;
pub mod config;
pub mod convert;
pub mod daemon;
pub mod engine;
pub mod error;
pub mod exit_node;
pub mod model;
pub mod observable;
pub mod scheduler;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult, Flag};
pub use config::{DEFAULT_PROVIDER_DOMAIN, DEFAULT_RECONNECT_DELAY, EngineConfig};
pub use daemon::{DaemonApi, NotifyStream};
pub use engine::{Phase, SyncEngine};
pub use error::CoreError;
pub use exit_node::{ExitNodePicker, ExitNodeSelector, PickerState};
pub use observable::{ListenerId, Observable, ObservableStream};
pub use scheduler::{Scheduler, TimerHandle};
pub use store::{CanonicalState, Property, PropertyName, StateStore};

// Re-export model types at the crate root for ergonomics.
pub use model::{CatalogEntry, GeoInfo, Location, Node, NodeIcon, RawPeer, RawPrefs};
