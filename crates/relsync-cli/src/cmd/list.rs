use crate::cmd::{load_config, runtime};
use crate::output::{print_json, print_table};
use anyhow::Context;
use relsync_core::cleanup::parse_version;
use relsync_core::paths;
use relsync_core::record::VersionRecord;
use relsync_core::store::{Store, StoreHandle};
use std::path::Path;

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let releases = config.releases()?;
    let store_path = config.store_path();
    if !store_path.exists() {
        if json {
            return print_json(&Vec::<VersionRecord>::new());
        }
        println!("No version store at {}.", store_path.display());
        return Ok(());
    }

    let records = runtime()?.block_on(async {
        let store = Store::open(&store_path)?;
        let handle = store.handle();
        let mut records = Vec::new();
        for release in &releases {
            let repo_key = paths::repo_key(&release.source, &release.org, &release.project);
            records.extend(
                recorded_versions(&handle, &repo_key)
                    .await
                    .with_context(|| format!("failed to list {repo_key}"))?,
            );
        }
        drop(handle);
        store.shutdown().await;
        Ok::<_, anyhow::Error>(records)
    })?;

    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No installed versions recorded.");
        return Ok(());
    }
    let rows = records
        .into_iter()
        .map(|r| vec![r.repo, r.version, r.artifact_path, r.link_path])
        .collect();
    print_table(&["REPO", "VERSION", "ARTIFACT", "LINK"], rows);
    Ok(())
}

/// Records under `repo_key`, oldest version first.
async fn recorded_versions(store: &StoreHandle, repo_key: &str) -> anyhow::Result<Vec<VersionRecord>> {
    let mut names = match store.list_buckets(repo_key).await {
        Ok(names) => names,
        Err(e) if e.is_nil_read() => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    names.sort_by(|a, b| match (parse_version(a), parse_version(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        _ => a.cmp(b),
    });

    let mut records = Vec::with_capacity(names.len());
    for name in names {
        let key = format!("{repo_key}/{name}/{}", paths::DATA_KEY);
        match store.get(&key).await {
            Ok(bytes) => records.push(VersionRecord::from_bytes(&bytes)?),
            Err(e) if e.is_nil_read() => tracing::warn!(key = %key, "version bucket without data"),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(records)
}
