use crate::cmd::{load_config, runtime};
use crate::output::{print_json, print_table};
use relsync_core::cleanup::{clean, CleanOptions};
use std::path::Path;

pub fn run(
    config_path: &Path,
    dry_run: bool,
    scan: bool,
    keep: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let releases = config.releases()?;
    let opts = CleanOptions {
        dry_run,
        scan_first: scan,
        threshold: keep.unwrap_or(config.keep),
    };
    if opts.threshold == 0 {
        anyhow::bail!("--keep must be at least 1");
    }

    let report = runtime()?.block_on(clean(
        &config.store_path(),
        &config.release_path(),
        &releases,
        opts,
    ))?;

    if json {
        print_json(&report)?;
    } else {
        if report.first_run {
            println!("First run: recorded {} installed versions, nothing removed.", report.scanned);
        } else if report.scanned > 0 {
            println!("Recorded {} installed versions found on disk.", report.scanned);
        }
        let verb = if report.dry_run { "would remove" } else { "removed" };
        if report.removed.is_empty() {
            println!("Nothing to remove.");
        } else {
            let rows = report
                .removed
                .iter()
                .map(|e| {
                    vec![
                        e.repo.clone(),
                        e.version.clone(),
                        verb.to_string(),
                        e.publish_path.clone(),
                    ]
                })
                .collect();
            print_table(&["REPO", "VERSION", "ACTION", "PATH"], rows);
        }
        for f in &report.errors {
            eprintln!("{}: {}", f.repo, f.error);
        }
    }

    if !report.errors.is_empty() {
        anyhow::bail!("cleanup failed for {} repos", report.errors.len());
    }
    Ok(())
}
