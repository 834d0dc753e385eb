//! Concurrent sync orchestrator: one task per Release, one result each.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::context::SyncContext;
use crate::error::RelsyncError;
use crate::io;
use crate::paths;
use crate::pipeline::{self, Outcome};
use crate::release::Release;
use crate::store::StoreHandle;

#[derive(Debug)]
pub struct SyncResult {
    pub release: Release,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncedRelease {
    pub repo: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub repo: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub synced: Vec<SyncedRelease>,
    pub up_to_date: Vec<String>,
    pub errors: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn total(&self) -> usize {
        self.synced.len() + self.up_to_date.len() + self.errors.len()
    }

    fn add(&mut self, result: SyncResult) {
        let SyncResult { release, outcome } = result;
        match outcome {
            Outcome::Updated => self.synced.push(SyncedRelease {
                repo: release.repo(),
                version: release.version.clone().unwrap_or_default(),
                artifact_path: release
                    .artifact_path
                    .as_ref()
                    .map(|p| p.display().to_string()),
                link_path: linked_path(&release),
            }),
            Outcome::AlreadyCurrent => self.up_to_date.push(release.repo()),
            Outcome::Failed(e) => self.errors.push(SyncFailure {
                repo: release.repo(),
                error: e.to_string(),
            }),
        }
    }
}

fn linked_path(release: &Release) -> Option<String> {
    if release.download_only || release.post_only {
        return None;
    }
    release.link_path.as_ref().map(|p| p.display().to_string())
}

/// Run every release's pipeline concurrently and aggregate the outcomes.
pub async fn sync(releases: Vec<Release>, ctx: &SyncContext) -> SyncReport {
    let (tx, mut rx) = mpsc::channel::<SyncResult>(releases.len().max(1));
    let mut tasks = JoinSet::new();
    let mut spawned = HashMap::new();

    for release in releases {
        let tx = tx.clone();
        let ctx = ctx.clone();
        let fallback = release.clone();
        let handle = tasks.spawn(async move {
            let result = sync_one(release, &ctx).await;
            let _ = tx.send(result).await;
        });
        spawned.insert(handle.id(), fallback);
    }

    // The join barrier: holds the last sender until every task has ended,
    // then drops it so the aggregator below sees the channel close.
    let supervisor = tokio::spawn(async move {
        while let Some(joined) = tasks.join_next_with_id().await {
            let Err(e) = joined else {
                continue;
            };
            let Some(release) = spawned.remove(&e.id()) else {
                continue;
            };
            warn!(repo = %release.repo(), error = %e, "release task panicked");
            let outcome = Outcome::Failed(RelsyncError::TaskFailed(e.to_string()));
            let _ = tx.send(SyncResult { release, outcome }).await;
        }
        drop(tx);
    });

    let mut report = SyncReport::default();
    while let Some(result) = rx.recv().await {
        report.add(result);
    }
    if let Err(e) = supervisor.await {
        warn!(error = %e, "sync supervisor failed");
    }
    info!(
        synced = report.synced.len(),
        up_to_date = report.up_to_date.len(),
        errors = report.errors.len(),
        "sync finished"
    );
    report
}

async fn sync_one(release: Release, ctx: &SyncContext) -> SyncResult {
    let (release, outcome) = pipeline::run(release, ctx).await;
    match &outcome {
        Outcome::Updated => {
            info!(
                repo = %release.repo(),
                version = release.version.as_deref().unwrap_or_default(),
                "synced"
            );
            if let Some(store) = &ctx.store {
                record_install(store, &release).await;
            }
        }
        Outcome::AlreadyCurrent => {
            info!(
                repo = %release.repo(),
                version = release.version.as_deref().unwrap_or_default(),
                "already up to date"
            );
        }
        Outcome::Failed(e) => {
            warn!(repo = %release.repo(), phase = %release.phase, error = %e, "sync failed");
            if release.cleanup_on_failure {
                cleanup_publish_dir(&release);
            }
        }
    }
    SyncResult { release, outcome }
}

async fn record_install(store: &StoreHandle, release: &Release) {
    let written = async {
        let record = release.record()?;
        let key = paths::data_key(&release.source, &release.org, &release.project, &record.version);
        store.write(key, record.to_bytes()?, true).await?;
        Ok::<_, RelsyncError>(())
    }
    .await;
    if let Err(e) = written {
        warn!(repo = %release.repo(), error = %e, "failed to record installed version");
    }
}

fn cleanup_publish_dir(release: &Release) {
    let Some(publish) = &release.publish_path else {
        return;
    };
    match io::remove_tree(publish) {
        Ok(_) => info!(repo = %release.repo(), path = %publish.display(), "removed partial install"),
        Err(e) => warn!(
            repo = %release.repo(),
            path = %publish.display(),
            error = %e,
            "failed to remove partial install"
        ),
    }
}
