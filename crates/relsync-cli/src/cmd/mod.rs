pub mod clean;
pub mod get;
pub mod list;
pub mod store;
pub mod sync;
pub mod watch;

use anyhow::Context;
use relsync_core::config::Config;
use relsync_core::download::Downloader;
use relsync_core::source::{http_client, SourceRegistry};
use relsync_core::store::Store;
use relsync_core::SyncContext;
use std::path::Path;

pub(crate) fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::load_or_default(path).with_context(|| format!("failed to load {}", path.display()))
}

pub(crate) fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start tokio runtime")
}

/// Open store, download pool and sources for one sync run. Must be created
/// inside the runtime.
pub(crate) struct Session {
    pub store: Store,
    pub ctx: SyncContext,
}

impl Session {
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let store_path = config.store_path();
        let store = Store::open(&store_path)
            .with_context(|| format!("failed to open version store {}", store_path.display()))?;
        let client = http_client()?;
        let downloader = Downloader::start(config.workers, client.clone());
        let sources = SourceRegistry::with_defaults(client);
        let ctx = SyncContext::from_config(config, downloader, sources).with_store(store.handle());
        Ok(Self { store, ctx })
    }

    /// Drain pending store writes and release the database.
    pub async fn close(self) {
        let Session { store, ctx } = self;
        drop(ctx);
        store.shutdown().await;
    }
}
