//! Per-release action pipeline.
//!
//! A Release moves through a fixed set of phases. Each phase expands into an
//! ordered list of [`Action`]s via the pure [`next_actions`]; the last action
//! of a phase is a [`Action::StageTransition`] into the next one. The runner
//! owns the queue and executes actions strictly in order.

mod action;
pub mod runner;

use serde::Serialize;

use crate::archive;
use crate::config::ShrinkConfig;
use crate::error::RelsyncError;
use crate::release::Release;

pub use runner::{run, Pipeline};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Resolve,
    Install,
    PostCommand,
    Finalize,
    Done,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Resolve => "resolve",
            Phase::Install => "install",
            Phase::PostCommand => "post_command",
            Phase::Finalize => "finalize",
            Phase::Done => "done",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Action / Step / Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Query,
    CheckAlreadyInstalled,
    ResolveDownloadUrl,
    PrepareArtifactPath,
    Download,
    Extract,
    LocateArtifactInTree,
    MakeExecutable,
    WriteReleaseNotes,
    /// argv, every element templated before execution.
    RunPostCommand(Vec<String>),
    Link,
    StageTransition(Phase),
    EndWork,
}

/// What the runner does after an action completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// Replace the remaining queue with the actions of this phase.
    Replace(Phase),
    /// The requested version is already installed; stop without changes.
    AlreadyCurrent,
    Finished,
}

#[derive(Debug)]
pub enum Outcome {
    Updated,
    AlreadyCurrent,
    Failed(RelsyncError),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

// ---------------------------------------------------------------------------
// Transition function
// ---------------------------------------------------------------------------

/// The ordered actions of `phase` for `release`. Pure: depends only on the
/// release's flags and resolved asset name, never on the filesystem.
pub fn next_actions(release: &Release, phase: Phase, shrink: &ShrinkConfig) -> Vec<Action> {
    match phase {
        Phase::Resolve => {
            let mut actions = vec![Action::Query, Action::CheckAlreadyInstalled];
            if !release.post_only {
                actions.push(Action::ResolveDownloadUrl);
            }
            actions.push(Action::PrepareArtifactPath);
            actions.push(Action::StageTransition(if release.post_only {
                Phase::PostCommand
            } else {
                Phase::Install
            }));
            actions
        }
        Phase::Install => {
            let mut actions = vec![Action::Download];
            if release.download_only {
                actions.push(Action::StageTransition(Phase::Finalize));
                return actions;
            }
            let packed = release.asset_name.as_deref().is_some_and(archive::is_archive);
            if packed {
                actions.push(Action::Extract);
            }
            actions.extend([
                Action::LocateArtifactInTree,
                Action::MakeExecutable,
                Action::WriteReleaseNotes,
                Action::StageTransition(Phase::PostCommand),
            ]);
            actions
        }
        Phase::PostCommand => {
            let mut actions = Vec::with_capacity(release.post_commands.len() + 2);
            let shrink_enabled = release.shrink.unwrap_or(shrink.enabled);
            if shrink_enabled && !release.post_only {
                let mut argv = vec![shrink.command.clone()];
                argv.extend(shrink.args.iter().cloned());
                argv.push("{{ .ArtifactPath }}".to_string());
                actions.push(Action::RunPostCommand(argv));
            }
            actions.extend(
                release
                    .post_commands
                    .iter()
                    .cloned()
                    .map(Action::RunPostCommand),
            );
            actions.push(Action::StageTransition(Phase::Finalize));
            actions
        }
        Phase::Finalize => {
            if release.post_only || release.download_only {
                vec![Action::EndWork]
            } else {
                vec![Action::Link, Action::EndWork]
            }
        }
        Phase::Done => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release() -> Release {
        let mut r = Release::new("github.com/o/tool", "latest").unwrap();
        r.asset_name = Some("tool_linux_amd64.tar.gz".into());
        r
    }

    #[test]
    fn resolve_ends_in_install() {
        let actions = next_actions(&release(), Phase::Resolve, &ShrinkConfig::default());
        assert_eq!(
            actions,
            vec![
                Action::Query,
                Action::CheckAlreadyInstalled,
                Action::ResolveDownloadUrl,
                Action::PrepareArtifactPath,
                Action::StageTransition(Phase::Install),
            ]
        );
    }

    #[test]
    fn post_only_skips_download_entirely() {
        let mut r = release();
        r.post_only = true;
        let shrink = ShrinkConfig::default();
        let resolve = next_actions(&r, Phase::Resolve, &shrink);
        assert!(!resolve.contains(&Action::ResolveDownloadUrl));
        assert_eq!(
            resolve.last(),
            Some(&Action::StageTransition(Phase::PostCommand))
        );
        assert_eq!(next_actions(&r, Phase::Finalize, &shrink), vec![Action::EndWork]);
    }

    #[test]
    fn install_extracts_archives_only() {
        let shrink = ShrinkConfig::default();
        let packed = next_actions(&release(), Phase::Install, &shrink);
        assert_eq!(packed[..2], [Action::Download, Action::Extract]);

        let mut raw = release();
        raw.asset_name = Some("tool-linux-amd64".into());
        let plain = next_actions(&raw, Phase::Install, &shrink);
        assert!(!plain.contains(&Action::Extract));
        assert!(plain.contains(&Action::LocateArtifactInTree));
        assert_eq!(
            plain.last(),
            Some(&Action::StageTransition(Phase::PostCommand))
        );
    }

    #[test]
    fn download_only_goes_straight_to_finalize_without_link() {
        let mut r = release();
        r.download_only = true;
        let shrink = ShrinkConfig::default();
        assert_eq!(
            next_actions(&r, Phase::Install, &shrink),
            vec![Action::Download, Action::StageTransition(Phase::Finalize)]
        );
        assert_eq!(next_actions(&r, Phase::Finalize, &shrink), vec![Action::EndWork]);
    }

    #[test]
    fn shrink_command_runs_before_post_commands() {
        let mut r = release();
        r.post_commands = vec![vec!["echo".into(), "{{ .Tag }}".into()]];
        let shrink = ShrinkConfig {
            enabled: true,
            command: "upx".into(),
            args: vec!["-q".into()],
        };
        let actions = next_actions(&r, Phase::PostCommand, &shrink);
        assert_eq!(
            actions,
            vec![
                Action::RunPostCommand(vec![
                    "upx".into(),
                    "-q".into(),
                    "{{ .ArtifactPath }}".into()
                ]),
                Action::RunPostCommand(vec!["echo".into(), "{{ .Tag }}".into()]),
                Action::StageTransition(Phase::Finalize),
            ]
        );

        // The per-release flag wins over the global setting.
        r.shrink = Some(false);
        assert_eq!(next_actions(&r, Phase::PostCommand, &shrink).len(), 2);
    }

    #[test]
    fn new_pipeline_is_seeded_with_resolve() {
        let mut r = release();
        r.phase = Phase::Finalize;
        let pipeline = Pipeline::new(r, &ShrinkConfig::default());
        assert_eq!(pipeline.release().phase, Phase::Resolve);
        assert_eq!(pipeline.pending().next(), Some(&Action::Query));
        assert_eq!(pipeline.pending().count(), 5);
    }

    #[test]
    fn finalize_links_then_ends() {
        assert_eq!(
            next_actions(&release(), Phase::Finalize, &ShrinkConfig::default()),
            vec![Action::Link, Action::EndWork]
        );
        assert!(next_actions(&release(), Phase::Done, &ShrinkConfig::default()).is_empty());
    }
}
