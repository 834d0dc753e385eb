use crate::cmd::{load_config, runtime, Session};
use crate::output::print_sync_report;
use relsync_core::config::RepoConfig;
use relsync_core::sync::sync;
use std::path::Path;

pub struct GetArgs {
    pub repo: String,
    pub version: String,
    pub file: Option<String>,
    pub url: Option<String>,
    pub download_only: bool,
}

/// Install a single release. A repo that is also configured keeps its
/// configured hints unless overridden on the command line.
pub fn run(config_path: &Path, args: GetArgs, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let mut entry = config
        .repos
        .iter()
        .find(|r| r.repo == args.repo)
        .cloned()
        .unwrap_or_else(|| RepoConfig::new(&args.repo));
    entry.version = args.version;
    if args.file.is_some() {
        entry.file = args.file;
    }
    if args.url.is_some() {
        entry.url = args.url;
    }
    if args.download_only {
        entry.download_only = true;
        entry.post_only = false;
    }
    let release = config.release_for(&entry)?;

    let report = runtime()?.block_on(async {
        let session = Session::open(&config)?;
        let report = sync(vec![release], &session.ctx).await;
        session.close().await;
        Ok::<_, anyhow::Error>(report)
    })?;

    print_sync_report(&report, json)?;
    if let Some(failure) = report.errors.first() {
        anyhow::bail!("{}: {}", failure.repo, failure.error);
    }
    Ok(())
}
