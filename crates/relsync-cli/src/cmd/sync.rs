use crate::cmd::{load_config, runtime, Session};
use crate::output::print_sync_report;
use relsync_core::sync::sync;
use std::path::Path;

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let releases = config.releases()?;
    if releases.is_empty() && !json {
        println!("No repos configured in {}.", config_path.display());
        return Ok(());
    }

    let report = runtime()?.block_on(async {
        let session = Session::open(&config)?;
        let report = sync(releases, &session.ctx).await;
        session.close().await;
        Ok::<_, anyhow::Error>(report)
    })?;

    print_sync_report(&report, json)?;
    if report.has_errors() {
        anyhow::bail!(
            "{} of {} releases failed",
            report.errors.len(),
            report.total()
        );
    }
    Ok(())
}
