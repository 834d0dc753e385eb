//! Retention cleanup: keep the newest N versions of each tracked repo and
//! evict the rest from disk and from the version store.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{RelsyncError, Result};
use crate::io;
use crate::paths;
use crate::record::VersionRecord;
use crate::release::Release;
use crate::store::{Store, StoreError, StoreHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanOptions {
    pub dry_run: bool,
    /// Record on-disk versions the store does not know about before cleaning.
    pub scan_first: bool,
    /// Versions to keep per repo unless the repo sets its own `keep`.
    pub threshold: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Eviction {
    pub repo: String,
    pub version: String,
    pub publish_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanFailure {
    pub repo: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct CleanReport {
    pub dry_run: bool,
    pub first_run: bool,
    /// Versions newly recorded by the filesystem scan.
    pub scanned: usize,
    pub removed: Vec<Eviction>,
    pub errors: Vec<CleanFailure>,
}

impl CleanReport {
    fn fail(&mut self, release: &Release, error: RelsyncError) {
        warn!(repo = %release.repo(), error = %error, "cleanup failed");
        self.errors.push(CleanFailure {
            repo: release.repo(),
            error: error.to_string(),
        });
    }
}

/// Open the store at `store_path`, clean every release's repo and shut the
/// store down. A store file that does not exist yet forces a dry run with a
/// filesystem scan, so the first invocation never deletes anything.
pub async fn clean(
    store_path: &Path,
    release_path: &Path,
    releases: &[Release],
    mut opts: CleanOptions,
) -> Result<CleanReport> {
    let first_run = !store_path.exists();
    if first_run {
        warn!(
            store = %store_path.display(),
            "no version store yet; scanning {} and running dry",
            release_path.display()
        );
        opts.dry_run = true;
        opts.scan_first = true;
    }
    let store = Store::open(store_path)?;
    let mut report = run(&store.handle(), release_path, releases, opts, first_run).await;
    report.first_run = first_run;
    store.shutdown().await;
    Ok(report)
}

/// Clean against an already running store. A dry run with `scan_first`
/// counts unrecorded versions without writing them.
pub async fn clean_with(
    store: &StoreHandle,
    release_path: &Path,
    releases: &[Release],
    opts: CleanOptions,
) -> CleanReport {
    run(store, release_path, releases, opts, false).await
}

/// `bootstrap` records scanned versions even during the forced dry run of a
/// first invocation.
async fn run(
    store: &StoreHandle,
    release_path: &Path,
    releases: &[Release],
    opts: CleanOptions,
    bootstrap: bool,
) -> CleanReport {
    let record = bootstrap || !opts.dry_run;
    let mut report = CleanReport {
        dry_run: opts.dry_run,
        ..CleanReport::default()
    };

    if opts.scan_first {
        for release in releases {
            match scan_repo(store, release_path, release, record).await {
                Ok(n) => report.scanned += n,
                Err(e) => report.fail(release, e),
            }
        }
    }

    for release in releases {
        let threshold = release.keep.unwrap_or(opts.threshold);
        match clean_repo(store, release_path, release, threshold, opts.dry_run).await {
            Ok(evicted) => report.removed.extend(evicted),
            Err(e) => report.fail(release, e),
        }
    }
    report
}

/// `1.2.3` or `v1.2.3`; anything else is not a version bucket.
pub fn parse_version(name: &str) -> Option<semver::Version> {
    semver::Version::parse(name.strip_prefix('v').unwrap_or(name)).ok()
}

async fn clean_repo(
    store: &StoreHandle,
    release_path: &Path,
    release: &Release,
    threshold: usize,
    dry_run: bool,
) -> Result<Vec<Eviction>> {
    let repo = release.repo();
    let repo_key = paths::repo_key(&release.source, &release.org, &release.project);
    let buckets = match store.list_buckets(&repo_key).await {
        Ok(b) => b,
        Err(e) if e.is_nil_read() => {
            debug!(repo = %repo, "nothing recorded");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut versions: Vec<(semver::Version, String)> = buckets
        .into_iter()
        .filter_map(|name| parse_version(&name).map(|v| (v, name)))
        .collect();
    if versions.len() < threshold {
        debug!(repo = %repo, count = versions.len(), threshold, "below retention threshold");
        return Ok(Vec::new());
    }
    versions.sort_by(|a, b| a.0.cmp(&b.0));
    let excess = versions.len() - threshold;

    let mut evicted = Vec::with_capacity(excess);
    for (_, name) in versions.into_iter().take(excess) {
        let version_key =
            paths::version_key(&release.source, &release.org, &release.project, &name);
        let bytes = store
            .get(format!("{version_key}/{}", paths::DATA_KEY))
            .await
            .map_err(|e| match e {
                StoreError::NilRead(_) => {
                    StoreError::Corrupt(format!("{version_key} has no {} entry", paths::DATA_KEY))
                }
                other => other,
            })?;
        let record = VersionRecord::from_bytes(&bytes).map_err(|e| {
            StoreError::Corrupt(format!("{version_key}: unreadable record: {e}"))
        })?;
        if parse_version(&record.version).is_none() {
            return Err(RelsyncError::InvalidVersion {
                repo: repo.clone(),
                version: record.version,
            });
        }

        let publish = if record.publish_path.is_empty() {
            paths::publish_dir(
                release_path,
                &release.source,
                &release.org,
                &release.project,
                &name,
            )
        } else {
            PathBuf::from(&record.publish_path)
        };

        if dry_run {
            info!(repo = %repo, version = %name, path = %publish.display(), "would remove");
        } else {
            if !io::remove_tree(&publish)? {
                debug!(repo = %repo, path = %publish.display(), "already absent on disk");
            }
            store.delete(&version_key).await?;
            info!(repo = %repo, version = %name, path = %publish.display(), "removed");
        }
        evicted.push(Eviction {
            repo: repo.clone(),
            version: name,
            publish_path: publish.display().to_string(),
        });
    }
    Ok(evicted)
}

/// Record every version directory of `release`'s repo. Already known
/// versions are left untouched. Returns the number newly recorded, or with
/// `record` unset the number that would be.
async fn scan_repo(
    store: &StoreHandle,
    release_path: &Path,
    release: &Release,
    record: bool,
) -> Result<usize> {
    let dir = paths::repo_dir(release_path, &release.source, &release.org, &release.project);
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut recorded = 0;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let version = entry.file_name().to_string_lossy().into_owned();
        let key = paths::data_key(&release.source, &release.org, &release.project, &version);
        if !record {
            match store.get(key).await {
                Ok(_) => {}
                Err(e) if e.is_nil_read() => recorded += 1,
                Err(e) => return Err(e.into()),
            }
            continue;
        }
        let publish = entry.path();
        let artifact_name = release.artifact.as_deref().unwrap_or(release.project.as_str());
        let artifact = publish.join(artifact_name);
        let entry_record = VersionRecord {
            version: version.clone(),
            os: release.os.clone(),
            arch: release.arch.clone(),
            source: release.source.clone(),
            org: release.org.clone(),
            project: release.project.clone(),
            repo: release.repo(),
            artifact_path: if artifact.is_file() {
                artifact.display().to_string()
            } else {
                String::new()
            },
            publish_path: publish.display().to_string(),
            link_path: String::new(),
            asset_name: String::new(),
            created_at: None,
        };
        match store.write(key, entry_record.to_bytes()?, false).await {
            Ok(()) => {
                debug!(repo = %release.repo(), version = %version, "recorded from disk");
                recorded += 1;
            }
            Err(e) if e.is_key_exists() => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(recorded)
}
