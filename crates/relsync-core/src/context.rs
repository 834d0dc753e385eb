use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::config::{Config, ShrinkConfig};
use crate::download::Downloader;
use crate::paths;
use crate::source::SourceRegistry;
use crate::store::StoreHandle;

/// Everything a pipeline needs besides its own Release. Cloned into every
/// release task; all members are cheap handles.
#[derive(Clone)]
pub struct SyncContext {
    pub release_path: PathBuf,
    /// Fallback for releases that carry no link dir of their own.
    pub link_dir: PathBuf,
    pub downloader: Downloader,
    pub sources: SourceRegistry,
    pub shrink: ShrinkConfig,
    pub store: Option<StoreHandle>,
    pub cancel: CancellationToken,
}

impl SyncContext {
    pub fn new(release_path: PathBuf, downloader: Downloader, sources: SourceRegistry) -> Self {
        Self {
            link_dir: paths::default_link_dir(&release_path),
            release_path,
            downloader,
            sources,
            shrink: ShrinkConfig::default(),
            store: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &Config, downloader: Downloader, sources: SourceRegistry) -> Self {
        Self {
            release_path: config.release_path(),
            link_dir: config.link_dir(),
            downloader,
            sources,
            shrink: config.shrink.clone(),
            store: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_store(mut self, store: StoreHandle) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_shrink(mut self, shrink: ShrinkConfig) -> Self {
        self.shrink = shrink;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
