use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{Action, Step};
use crate::archive;
use crate::asset::select_asset;
use crate::context::SyncContext;
use crate::error::{RelsyncError, Result};
use crate::io;
use crate::paths;
use crate::release::{QueryType, Release};
use crate::template;

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Query => "query",
            Action::CheckAlreadyInstalled => "check_already_installed",
            Action::ResolveDownloadUrl => "resolve_download_url",
            Action::PrepareArtifactPath => "prepare_artifact_path",
            Action::Download => "download",
            Action::Extract => "extract",
            Action::LocateArtifactInTree => "locate_artifact",
            Action::MakeExecutable => "make_executable",
            Action::WriteReleaseNotes => "write_release_notes",
            Action::RunPostCommand(_) => "run_post_command",
            Action::Link => "link",
            Action::StageTransition(_) => "stage_transition",
            Action::EndWork => "end_work",
        }
    }

    pub(crate) async fn execute(&self, release: &mut Release, ctx: &SyncContext) -> Result<Step> {
        match self {
            Action::Query => query(release, ctx).await,
            Action::CheckAlreadyInstalled => check_already_installed(release, ctx),
            Action::ResolveDownloadUrl => resolve_download_url(release),
            Action::PrepareArtifactPath => prepare_artifact_path(release, ctx),
            Action::Download => download(release, ctx).await,
            Action::Extract => extract(release).await,
            Action::LocateArtifactInTree => locate_artifact(release),
            Action::MakeExecutable => {
                io::make_executable(required(&release.artifact_path, "artifact_path")?)?;
                Ok(Step::Continue)
            }
            Action::WriteReleaseNotes => write_release_notes(release),
            Action::RunPostCommand(argv) => run_post_command(argv, release, ctx).await,
            Action::Link => link(release),
            Action::StageTransition(phase) => {
                if ctx.cancel.is_cancelled() {
                    return Err(RelsyncError::Cancelled);
                }
                Ok(Step::Replace(*phase))
            }
            Action::EndWork => Ok(Step::Finished),
        }
    }
}

fn required<'a>(value: &'a Option<PathBuf>, what: &'static str) -> Result<&'a Path> {
    value.as_deref().ok_or(RelsyncError::Unresolved(what))
}

// ---------------------------------------------------------------------------
// Resolve
// ---------------------------------------------------------------------------

async fn query(release: &mut Release, ctx: &SyncContext) -> Result<Step> {
    let source = ctx.sources.get(&release.source)?;
    let found = match &release.query {
        QueryType::Latest => source.latest(&release.org, &release.project).await?,
        QueryType::ByTag(tag) => source.by_tag(&release.org, &release.project, tag).await?,
    };
    debug!(
        repo = %release.repo(),
        version = %found.tag,
        assets = found.assets.len(),
        "release resolved"
    );
    if !paths::is_single_segment(&found.tag) {
        return Err(RelsyncError::InvalidTag {
            repo: release.repo(),
            tag: found.tag,
        });
    }
    release.version = Some(found.tag);
    release.release_notes = found.notes;
    release.created_at = found.created_at;
    release.assets = found.assets;
    Ok(Step::Continue)
}

fn check_already_installed(release: &mut Release, ctx: &SyncContext) -> Result<Step> {
    let publish = release.publish_dir(&ctx.release_path)?;
    let installed = publish.exists();
    release.publish_path = Some(publish);
    if installed {
        Ok(Step::AlreadyCurrent)
    } else {
        Ok(Step::Continue)
    }
}

fn resolve_download_url(release: &mut Release) -> Result<Step> {
    let data = release.template_data();

    if let Some(url_tpl) = &release.url {
        let url = template::render(url_tpl, &data)?;
        let name = match &release.file {
            Some(file) => template::render(file, &data)?,
            None => file_name_from_url(&url),
        };
        release.asset_name = Some(name);
        release.download_url = Some(url);
        return Ok(Step::Continue);
    }

    let (asset, wanted) = match &release.file {
        Some(file) => {
            let name = template::render(file, &data)?;
            let asset = release.assets.iter().find(|a| a.name == name).cloned();
            (asset, name)
        }
        None => (
            select_asset(&release.assets, &release.os, &release.arch).cloned(),
            format!("{}/{}", release.os, release.arch),
        ),
    };
    let asset = asset.ok_or_else(|| RelsyncError::NoMatchingAsset {
        repo: release.repo(),
        tag: release.version.clone().unwrap_or_default(),
        wanted,
    })?;
    release.asset_name = Some(asset.name);
    release.download_url = Some(asset.url);
    Ok(Step::Continue)
}

fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("download")
        .to_string()
}

fn prepare_artifact_path(release: &mut Release, ctx: &SyncContext) -> Result<Step> {
    let publish = match &release.publish_path {
        Some(p) => p.clone(),
        None => release.publish_dir(&ctx.release_path)?,
    };
    io::ensure_dir(&publish)?;
    release.cleanup_on_failure = true;

    let file_name = match &release.asset_name {
        Some(name) => name.clone(),
        None => artifact_name(release)?,
    };
    release.artifact_path = Some(publish.join(file_name));

    let link_dir = release.link_dir.clone().unwrap_or_else(|| ctx.link_dir.clone());
    let mut link_name = release
        .link_name
        .clone()
        .unwrap_or_else(|| release.project.clone());
    if release.is_windows() && !link_name.ends_with(".exe") {
        link_name.push_str(".exe");
    }
    release.link_path = Some(link_dir.join(link_name));
    release.publish_path = Some(publish);
    Ok(Step::Continue)
}

/// Executable name inside the publish tree: the templated `artifact` hint or
/// the project name.
fn artifact_name(release: &Release) -> Result<String> {
    match &release.artifact {
        Some(tpl) => template::render(tpl, &release.template_data()),
        None => Ok(release.project.clone()),
    }
}

// ---------------------------------------------------------------------------
// Install
// ---------------------------------------------------------------------------

async fn download(release: &mut Release, ctx: &SyncContext) -> Result<Step> {
    let url = release
        .download_url
        .as_deref()
        .ok_or(RelsyncError::Unresolved("download_url"))?;
    let dest = required(&release.artifact_path, "artifact_path")?;
    let bytes = ctx.downloader.download(url, dest, &ctx.cancel).await?;
    info!(repo = %release.repo(), version = %release.tag()?, bytes, "downloaded");
    Ok(Step::Continue)
}

async fn extract(release: &mut Release) -> Result<Step> {
    let archive_path = required(&release.artifact_path, "artifact_path")?.to_path_buf();
    let publish = required(&release.publish_path, "publish_path")?.to_path_buf();
    let dest = publish.clone();
    let source = archive_path.clone();
    tokio::task::spawn_blocking(move || archive::extract(&source, &dest))
        .await
        .map_err(|e| RelsyncError::Archive {
            path: archive_path.display().to_string(),
            reason: e.to_string(),
        })??;
    debug!(repo = %release.repo(), archive = %archive_path.display(), "extracted");
    release.artifact_path = Some(publish.join(artifact_name(release)?));
    Ok(Step::Continue)
}

fn locate_artifact(release: &mut Release) -> Result<Step> {
    let expected = required(&release.artifact_path, "artifact_path")?;
    if expected.is_file() {
        return Ok(Step::Continue);
    }
    let publish = required(&release.publish_path, "publish_path")?;
    let name = artifact_name(release)?;
    let mut names = vec![name.clone()];
    if release.is_windows() && !name.ends_with(".exe") {
        names.push(format!("{name}.exe"));
    }
    match find_file(publish, &names)? {
        Some(found) => {
            debug!(repo = %release.repo(), path = %found.display(), "artifact located");
            release.artifact_path = Some(found);
            Ok(Step::Continue)
        }
        None => Err(RelsyncError::ArtifactNotFound {
            name,
            root: publish.display().to_string(),
        }),
    }
}

/// Depth-first search for a regular file named one of `names`.
fn find_file(root: &Path, names: &[String]) -> Result<Option<PathBuf>> {
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                stack.push(path);
            } else if names.iter().any(|n| entry.file_name() == n.as_str()) {
                return Ok(Some(path));
            }
        }
    }
    Ok(None)
}

fn write_release_notes(release: &mut Release) -> Result<Step> {
    if release.release_notes.trim().is_empty() {
        return Ok(Step::Continue);
    }
    let publish = required(&release.publish_path, "publish_path")?;
    io::atomic_write(
        &publish.join(paths::NOTES_FILE),
        release.release_notes.as_bytes(),
    )?;
    Ok(Step::Continue)
}

// ---------------------------------------------------------------------------
// PostCommand / Finalize
// ---------------------------------------------------------------------------

async fn run_post_command(argv: &[String], release: &mut Release, ctx: &SyncContext) -> Result<Step> {
    let Some((program, _)) = argv.split_first() else {
        return Ok(Step::Continue);
    };
    if *program == ctx.shrink.command && which::which(program).is_err() {
        return Err(RelsyncError::ShrinkToolMissing(program.clone()));
    }

    let data = release.template_data();
    let rendered = argv
        .iter()
        .map(|arg| template::render(arg, &data))
        .collect::<Result<Vec<_>>>()?;
    let command = rendered.join(" ");
    let cwd = required(&release.publish_path, "publish_path")?;

    debug!(repo = %release.repo(), command = %command, "running post command");
    let output = tokio::process::Command::new(&rendered[0])
        .args(&rendered[1..])
        .current_dir(cwd)
        .output()
        .await
        .map_err(|e| RelsyncError::PostCommand {
            command: command.clone(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        return Err(RelsyncError::PostCommand {
            command,
            reason: format!("exit {code}: {}", stderr.trim()),
        });
    }
    Ok(Step::Continue)
}

fn link(release: &mut Release) -> Result<Step> {
    let target = required(&release.artifact_path, "artifact_path")?;
    let link = required(&release.link_path, "link_path")?;
    io::replace_symlink(target, link)?;
    info!(repo = %release.repo(), link = %link.display(), "linked");
    Ok(Step::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_file_name_ignores_query() {
        assert_eq!(
            file_name_from_url("https://dl.example.com/a/tool-1.0.tar.gz?sig=abc"),
            "tool-1.0.tar.gz"
        );
        assert_eq!(file_name_from_url("https://dl.example.com/bin/"), "bin");
    }

    #[test]
    fn find_file_descends_into_subdirectories() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("tool-1.0/bin");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("tool"), b"#!").unwrap();
        let found = find_file(dir.path(), &["tool".to_string()]).unwrap();
        assert_eq!(found, Some(nested.join("tool")));
        assert!(find_file(dir.path(), &["other".to_string()]).unwrap().is_none());
    }

    #[test]
    fn locate_artifact_accepts_exe_on_windows() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("tool-1.0/bin");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("tool.exe"), b"MZ").unwrap();

        let mut release = Release::new("github.com/o/tool", "latest").unwrap();
        release.os = "windows".into();
        release.publish_path = Some(dir.path().to_path_buf());
        release.artifact_path = Some(dir.path().join("tool"));
        assert_eq!(locate_artifact(&mut release).unwrap(), Step::Continue);
        assert_eq!(release.artifact_path, Some(nested.join("tool.exe")));

        let mut linux = Release::new("github.com/o/tool", "latest").unwrap();
        linux.os = "linux".into();
        linux.publish_path = Some(dir.path().to_path_buf());
        linux.artifact_path = Some(dir.path().join("tool"));
        assert!(matches!(
            locate_artifact(&mut linux),
            Err(RelsyncError::ArtifactNotFound { .. })
        ));
    }
}
