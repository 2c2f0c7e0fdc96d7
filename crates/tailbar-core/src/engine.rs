// ── Sync engine ──
//
// Full lifecycle management for one daemon connection. Handles the
// snapshot, the long-lived update stream, fixed-delay reconnects, and
// the write commands that patch preferences, all from a single task that
// is the only writer of canonical state.

use std::future::Future;
use std::sync::Arc;

use strum::Display;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tailbar_api::{LocalClient, PrefField, PrefsPatch};

use crate::command::{Command, CommandEnvelope, CommandResult, Flag};
use crate::config::EngineConfig;
use crate::daemon::DaemonApi;
use crate::error::CoreError;
use crate::exit_node::{ExitNodePicker, ExitNodeSelector};
use crate::model::{Location, Node};
use crate::scheduler::Scheduler;
use crate::store::{Property, Reconciler, StateStore};

const COMMAND_CHANNEL_SIZE: usize = 64;

// ── Phase ────────────────────────────────────────────────────────

/// Lifecycle phase observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Idle,
    Connecting,
    Snapshotting,
    Streaming,
    Backoff,
    Disposed,
}

// ── SyncEngine ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<EngineInner>`. Call
/// [`start()`](Self::start) to spawn the sync loop and
/// [`dispose()`](Self::dispose) to tear it down; an engine that is
/// dropped without being disposed keeps its loop running.
pub struct SyncEngine<A: DaemonApi = LocalClient> {
    inner: Arc<EngineInner<A>>,
}

impl<A: DaemonApi> Clone for SyncEngine<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct EngineInner<A> {
    config: EngineConfig,
    api: Arc<A>,
    store: Arc<StateStore>,
    phase: watch::Sender<Phase>,
    last_error: watch::Sender<Option<CoreError>>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    scheduler: Scheduler,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncEngine<LocalClient> {
    /// Create an engine that talks to the daemon socket named in `config`.
    /// Does NOT connect; call [`start()`](Self::start).
    pub fn new(config: EngineConfig) -> Self {
        let api = LocalClient::new(config.transport());
        Self::with_api(api, config)
    }

    /// One-shot: start, wait for the first snapshot, run closure, dispose.
    pub async fn oneshot<F, Fut, T, E>(config: EngineConfig, f: F) -> Result<T, E>
    where
        F: FnOnce(SyncEngine) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CoreError>,
    {
        Self::new(config).run_once(f).await
    }
}

impl<A: DaemonApi> SyncEngine<A> {
    /// Create an engine over any [`DaemonApi`] implementation.
    pub fn with_api(api: A, config: EngineConfig) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        let (last_error, _) = watch::channel(None);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        let scheduler = Scheduler::new(&cancel);

        Self {
            inner: Arc::new(EngineInner {
                config,
                api: Arc::new(api),
                store: Arc::new(StateStore::new()),
                phase,
                last_error,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel,
                scheduler,
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Access the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Access the canonical state store.
    pub fn store(&self) -> &Arc<StateStore> {
        &self.inner.store
    }

    /// Access the engine's scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the sync loop. Calling it again while running is a no-op.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.current_phase() == Phase::Disposed {
            return Err(CoreError::Disposed);
        }
        let Some(commands) = self.inner.command_rx.lock().await.take() else {
            return Ok(());
        };

        set_phase(&self.inner.phase, Phase::Connecting);
        let task = EngineTask {
            reconciler: Reconciler::new(self.inner.config.provider_domains.clone()),
            inner: Arc::clone(&self.inner),
            commands,
        };
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(task.run()));
        Ok(())
    }

    /// Wait until the first snapshot has been applied.
    ///
    /// Fails with the cause if the engine falls into backoff first.
    pub async fn ready(&self) -> Result<(), CoreError> {
        let mut phase = self.inner.phase.subscribe();
        loop {
            let current = *phase.borrow_and_update();
            match current {
                Phase::Streaming => return Ok(()),
                Phase::Backoff => {
                    return Err(self.last_error().unwrap_or(CoreError::DaemonUnreachable {
                        reason: "connection lost".into(),
                    }));
                }
                Phase::Idle => return Err(CoreError::NotRunning),
                Phase::Disposed => return Err(CoreError::Disposed),
                Phase::Connecting | Phase::Snapshotting => {}
            }
            if phase.changed().await.is_err() {
                return Err(CoreError::Disposed);
            }
        }
    }

    /// Stop the loop, close the stream, and release every timer.
    pub async fn dispose(&self) {
        self.inner.cancel.cancel();
        self.inner.scheduler.cancel_all();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.store.clear_listeners();
        set_phase(&self.inner.phase, Phase::Disposed);
        debug!("engine disposed");
    }

    /// Start, wait for the first snapshot, run `f`, then dispose.
    pub async fn run_once<F, Fut, T, E>(self, f: F) -> Result<T, E>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CoreError>,
    {
        self.start().await?;
        if let Err(e) = self.ready().await {
            self.dispose().await;
            return Err(e.into());
        }
        let result = f(self.clone()).await;
        self.dispose().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to lifecycle phase changes.
    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.inner.phase.subscribe()
    }

    pub fn current_phase(&self) -> Phase {
        *self.inner.phase.borrow()
    }

    /// The failure that sent the engine into its latest backoff.
    pub fn last_error(&self) -> Option<CoreError> {
        self.inner.last_error.borrow().clone()
    }

    /// Subscribe to the property change feed.
    pub fn changes(&self) -> broadcast::Receiver<Property> {
        self.inner.store.subscribe_changes()
    }

    pub fn running(&self) -> bool {
        self.inner.store.running().get()
    }

    pub fn accept_dns(&self) -> bool {
        self.inner.store.accept_dns().get()
    }

    pub fn accept_routes(&self) -> bool {
        self.inner.store.accept_routes().get()
    }

    pub fn allow_lan_access(&self) -> bool {
        self.inner.store.allow_lan_access().get()
    }

    pub fn shields_up(&self) -> bool {
        self.inner.store.shields_up().get()
    }

    pub fn ssh(&self) -> bool {
        self.inner.store.ssh().get()
    }

    pub fn exit_node(&self) -> Option<String> {
        self.inner.store.exit_node().get()
    }

    pub fn nodes(&self) -> Option<Arc<Vec<Node>>> {
        self.inner.store.nodes().get()
    }

    /// Selectable provider locations matching `query`.
    pub fn exit_node_locations(&self, query: &str) -> Vec<Location> {
        let nodes = self.nodes().unwrap_or_default();
        ExitNodeSelector::locations(&nodes, query)
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command on the engine task and await its result.
    pub async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        match self.current_phase() {
            Phase::Idle => return Err(CoreError::NotRunning),
            Phase::Disposed => return Err(CoreError::Disposed),
            _ => {}
        }

        let (tx, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::Disposed)?;

        rx.await.map_err(|_| CoreError::Disposed)?
    }

    async fn set_flag(&self, flag: Flag, value: bool) -> Result<(), CoreError> {
        self.execute(Command::SetFlag { flag, value }).await.map(drop)
    }

    /// Patches `WantRunning`.
    pub async fn set_running(&self, value: bool) -> Result<(), CoreError> {
        self.set_flag(Flag::Running, value).await
    }

    pub async fn set_accept_dns(&self, value: bool) -> Result<(), CoreError> {
        self.set_flag(Flag::AcceptDns, value).await
    }

    pub async fn set_accept_routes(&self, value: bool) -> Result<(), CoreError> {
        self.set_flag(Flag::AcceptRoutes, value).await
    }

    pub async fn set_allow_lan_access(&self, value: bool) -> Result<(), CoreError> {
        self.set_flag(Flag::AllowLanAccess, value).await
    }

    pub async fn set_shields_up(&self, value: bool) -> Result<(), CoreError> {
        self.set_flag(Flag::ShieldsUp, value).await
    }

    pub async fn set_ssh(&self, value: bool) -> Result<(), CoreError> {
        self.set_flag(Flag::Ssh, value).await
    }

    /// Select an exit node by stable ID, or clear it with `None`.
    pub async fn set_exit_node(&self, node_id: Option<&str>) -> Result<(), CoreError> {
        self.execute(Command::SetExitNode(node_id.map(str::to_owned)))
            .await
            .map(drop)
    }

    /// Select `node_id`, or clear it if it is already the exit node.
    pub async fn toggle_exit_node(&self, node_id: &str) -> Result<(), CoreError> {
        self.execute(Command::ToggleExitNode(node_id.to_owned()))
            .await
            .map(drop)
    }

    /// Write the picker's pending selection and collapse it.
    pub async fn commit_selection(&self, picker: &mut ExitNodePicker) -> Result<Node, CoreError> {
        let node = picker
            .take_selection()
            .ok_or_else(|| CoreError::ValidationFailed {
                message: "no exit node selected".into(),
            })?;
        self.set_exit_node(Some(&node.id)).await?;
        Ok(node)
    }
}

// ── Engine task ──────────────────────────────────────────────────

/// Why a connection session ended.
enum SessionEnd {
    Cancelled,
    Failed(CoreError),
}

/// The single owner of canonical state.
struct EngineTask<A> {
    inner: Arc<EngineInner<A>>,
    reconciler: Reconciler,
    commands: mpsc::Receiver<CommandEnvelope>,
}

impl<A: DaemonApi> EngineTask<A> {
    async fn run(mut self) {
        loop {
            match self.session().await {
                SessionEnd::Cancelled => break,
                SessionEnd::Failed(e) => {
                    warn!(error = %e, "daemon connection lost");
                    if !self.backoff(e).await {
                        break;
                    }
                }
            }
        }
        set_phase(&self.inner.phase, Phase::Disposed);
    }

    /// Connect, snapshot, then stream until something goes wrong.
    async fn session(&mut self) -> SessionEnd {
        let api = Arc::clone(&self.inner.api);
        let store = Arc::clone(&self.inner.store);

        // Each request opens its own socket, so there is no separate
        // handshake to wait for before snapshotting.
        set_phase(&self.inner.phase, Phase::Connecting);
        set_phase(&self.inner.phase, Phase::Snapshotting);

        let snapshot = self.drive(async { tokio::join!(api.status(), api.prefs()) });
        let (status, prefs) = match snapshot.await {
            None => return SessionEnd::Cancelled,
            Some((Ok(status), Ok(prefs))) => (status, prefs),
            Some((Err(e), _) | (_, Err(e))) => return SessionEnd::Failed(e.into()),
        };
        self.reconciler.apply_snapshot(&store, &status, &prefs);
        debug!(backend = %status.backend_state, "snapshot applied");

        set_phase(&self.inner.phase, Phase::Streaming);
        self.inner.last_error.send_replace(None);

        let stream_cancel = self.inner.cancel.child_token();
        let mut stream = match self.drive(api.watch(stream_cancel)).await {
            None => return SessionEnd::Cancelled,
            Some(Ok(stream)) => stream,
            Some(Err(e)) => return SessionEnd::Failed(e.into()),
        };

        loop {
            let next = futures_util::StreamExt::next(&mut stream);
            match self.drive(next).await {
                None => return SessionEnd::Cancelled,
                Some(Some(Ok(notify))) => self.reconciler.apply_notify(&store, &notify),
                Some(Some(Err(e))) => return SessionEnd::Failed(e.into()),
                Some(None) => {
                    return SessionEnd::Failed(CoreError::StreamEnded {
                        reason: "closed by daemon".into(),
                    });
                }
            }
        }
    }

    /// Mark the daemon down and wait out the fixed delay.
    ///
    /// Returns `false` if the engine was cancelled meanwhile.
    async fn backoff(&mut self, cause: CoreError) -> bool {
        self.inner.last_error.send_replace(Some(cause));
        self.reconciler.mark_down(&self.inner.store);
        set_phase(&self.inner.phase, Phase::Backoff);

        let delay = self.inner.config.reconnect_delay;
        let (fire_tx, fire_rx) = oneshot::channel();
        let timer = self.inner.scheduler.schedule_once(delay, async move {
            let _ = fire_tx.send(());
        });
        debug!(delay_ms = delay.as_millis(), "reconnect scheduled");

        match self.drive(fire_rx).await {
            Some(Ok(())) => true,
            Some(Err(_)) => false,
            None => {
                timer.cancel();
                false
            }
        }
    }

    /// Run `fut` to completion while servicing write commands.
    ///
    /// Returns `None` as soon as the engine is cancelled.
    async fn drive<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        let cancel = self.inner.cancel.clone();
        tokio::pin!(fut);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return None,
                out = &mut fut => return Some(out),
                Some(envelope) = self.commands.recv() => {
                    let result = self.apply_command(envelope.command).await;
                    let _ = envelope.response_tx.send(result);
                }
            }
        }
    }

    // ── Command routing ──────────────────────────────────────────

    async fn apply_command(&mut self, command: Command) -> Result<CommandResult, CoreError> {
        let inner = Arc::clone(&self.inner);
        let store = &inner.store;

        let patch = match command {
            Command::SetFlag { flag, value } => {
                if flag.current(store) == value {
                    return Ok(CommandResult::Unchanged);
                }
                PrefsPatch::single(flag.pref_field(), value)?
            }
            Command::SetExitNode(target) => {
                if store.exit_node().get() == target {
                    return Ok(CommandResult::Unchanged);
                }
                exit_node_patch(target.as_deref())?
            }
            Command::ToggleExitNode(node_id) => {
                if store.exit_node().get().as_deref() == Some(node_id.as_str()) {
                    exit_node_patch(None)?
                } else {
                    let node = store
                        .node_by_id(&node_id)
                        .ok_or_else(|| CoreError::NodeNotFound {
                            identifier: node_id.clone(),
                        })?;
                    if !node.can_be_exit_node {
                        return Err(CoreError::ValidationFailed {
                            message: format!("{} cannot be used as an exit node", node.name),
                        });
                    }
                    exit_node_patch(Some(&node_id))?
                }
            }
        };

        debug!(fields = ?patch.fields().collect::<Vec<_>>(), "writing prefs");
        let echo = tokio::select! {
            biased;
            () = inner.cancel.cancelled() => return Err(CoreError::Disposed),
            echo = inner.api.edit_prefs(&patch) => echo?,
        };
        self.reconciler.apply_prefs(store, &echo);
        Ok(CommandResult::Applied)
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn exit_node_patch(node_id: Option<&str>) -> Result<PrefsPatch, CoreError> {
    PrefsPatch::single(PrefField::ExitNodeId, node_id.unwrap_or_default()).map_err(CoreError::from)
}

fn set_phase(phase: &watch::Sender<Phase>, next: Phase) {
    let changed = phase.send_if_modified(|current| {
        // Disposed is terminal.
        if *current == next || *current == Phase::Disposed {
            false
        } else {
            *current = next;
            true
        }
    });
    if changed {
        info!(phase = %next, "engine phase");
    }
}
