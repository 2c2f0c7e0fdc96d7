// ── Daemon access seam ──
//
// The engine reaches the daemon only through `DaemonApi`, so the sync
// loop can be driven by a scripted fake in tests.

use std::future::Future;
use std::pin::Pin;

use futures_core::Stream;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use tailbar_api::client::watch_opts;
use tailbar_api::models::{IpnStatus, Notify, Prefs};
use tailbar_api::{Error, LocalClient, PrefsPatch};

/// Boxed watch-bus record stream.
pub type NotifyStream = Pin<Box<dyn Stream<Item = Result<Notify, Error>> + Send>>;

/// The four daemon operations the engine needs.
pub trait DaemonApi: Send + Sync + 'static {
    fn status(&self) -> impl Future<Output = Result<IpnStatus, Error>> + Send;

    fn prefs(&self) -> impl Future<Output = Result<Prefs, Error>> + Send;

    /// Apply a patch and return the daemon's resulting preferences.
    fn edit_prefs(&self, patch: &PrefsPatch) -> impl Future<Output = Result<Prefs, Error>> + Send;

    /// Open the update bus. The first record carries full state.
    fn watch(
        &self,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<NotifyStream, Error>> + Send;
}

impl DaemonApi for LocalClient {
    fn status(&self) -> impl Future<Output = Result<IpnStatus, Error>> + Send {
        LocalClient::status(self)
    }

    fn prefs(&self) -> impl Future<Output = Result<Prefs, Error>> + Send {
        LocalClient::prefs(self)
    }

    fn edit_prefs(&self, patch: &PrefsPatch) -> impl Future<Output = Result<Prefs, Error>> + Send {
        LocalClient::edit_prefs(self, patch)
    }

    fn watch(
        &self,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<NotifyStream, Error>> + Send {
        async move {
            let stream = self.watch_ipn_bus(watch_opts::INITIAL, cancel).await?;
            Ok(stream.boxed())
        }
    }
}
