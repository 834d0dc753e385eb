use crate::error::{RelsyncError, Result};
use crate::paths;
use crate::release::{parse_repo, Release};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ShrinkConfig
// ---------------------------------------------------------------------------

/// Optional compressor run on every installed artifact (e.g. `upx`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShrinkConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_shrink_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_shrink_command() -> String {
    "upx".to_string()
}

impl Default for ShrinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: default_shrink_command(),
            args: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// RepoConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// `source/org/project`, e.g. `github.com/cli/cli`.
    pub repo: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep: Option<usize>,
    #[serde(default)]
    pub download_only: bool,
    #[serde(default)]
    pub post_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shrink: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

fn default_version() -> String {
    crate::release::LATEST.to_string()
}

impl RepoConfig {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            version: default_version(),
            file: None,
            url: None,
            artifact: None,
            link: None,
            keep: None,
            download_only: false,
            post_only: false,
            shrink: None,
            post: Vec::new(),
            os: None,
            arch: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_release_path")]
    pub release_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_dir: Option<PathBuf>,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_keep")]
    pub keep: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(default)]
    pub shrink: ShrinkConfig,
    #[serde(default)]
    pub repos: Vec<RepoConfig>,
}

fn default_release_path() -> PathBuf {
    PathBuf::from("~/.local/share/relsync")
}

fn default_workers() -> usize {
    crate::download::DEFAULT_WORKERS
}

fn default_keep() -> usize {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            release_path: default_release_path(),
            store_path: None,
            link_dir: None,
            workers: default_workers(),
            keep: default_keep(),
            os: None,
            arch: None,
            shrink: ShrinkConfig::default(),
            repos: Vec::new(),
        }
    }
}

impl Config {
    /// Load and validate the config at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            RelsyncError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Config = serde_yaml::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(RelsyncError::Config("workers must be at least 1".into()));
        }
        let mut seen = HashSet::new();
        for repo in &self.repos {
            parse_repo(&repo.repo)?;
            if !seen.insert(repo.repo.as_str()) {
                return Err(RelsyncError::Config(format!(
                    "repo '{}' is listed twice",
                    repo.repo
                )));
            }
            if repo.download_only && repo.post_only {
                return Err(RelsyncError::Config(format!(
                    "repo '{}': download_only and post_only are mutually exclusive",
                    repo.repo
                )));
            }
        }
        Ok(())
    }

    pub fn release_path(&self) -> PathBuf {
        paths::expand_home(&self.release_path)
    }

    pub fn store_path(&self) -> PathBuf {
        match &self.store_path {
            Some(p) => paths::expand_home(p),
            None => paths::default_store_path(&self.release_path()),
        }
    }

    pub fn link_dir(&self) -> PathBuf {
        match &self.link_dir {
            Some(p) => paths::expand_home(p),
            None => paths::default_link_dir(&self.release_path()),
        }
    }

    /// Whether a sync session built from `self` can keep serving `other`:
    /// same store, paths, pool size and shrink settings.
    pub fn same_session(&self, other: &Config) -> bool {
        self.store_path() == other.store_path()
            && self.release_path() == other.release_path()
            && self.link_dir() == other.link_dir()
            && self.workers == other.workers
            && self.shrink == other.shrink
    }

    /// One Release per configured repo.
    pub fn releases(&self) -> Result<Vec<Release>> {
        self.repos.iter().map(|r| self.release_for(r)).collect()
    }

    pub fn release_for(&self, repo: &RepoConfig) -> Result<Release> {
        let mut release = Release::new(&repo.repo, &repo.version)?;
        release.file = repo.file.clone();
        release.url = repo.url.clone();
        release.artifact = repo.artifact.clone();
        release.link_name = repo.link.clone();
        release.keep = repo.keep;
        release.download_only = repo.download_only;
        release.post_only = repo.post_only;
        release.shrink = repo.shrink;
        release.post_commands = repo.post.clone();
        release.link_dir = Some(self.link_dir());
        if let Some(os) = repo.os.as_ref().or(self.os.as_ref()) {
            release.os = os.clone();
        }
        if let Some(arch) = repo.arch.as_ref().or(self.arch.as_ref()) {
            release.arch = arch.clone();
        }
        Ok(release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
release_path: /srv/releases
workers: 2
keep: 5
arch: arm64
shrink:
  enabled: true
  args: ["-q"]
repos:
  - repo: github.com/cli/cli
    file: "gh_{{ .Version }}_linux_arm64.tar.gz"
    artifact: gh
    keep: 2
    post:
      - ["sh", "-c", "echo {{ .Tag }}"]
  - repo: gitlab.com/grp/tool
    version: v1.2.0
    download_only: true
    os: darwin
"#;

    #[test]
    fn parses_full_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relsync.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = Config::load(&path).unwrap();

        assert_eq!(config.workers, 2);
        assert_eq!(config.keep, 5);
        assert_eq!(config.shrink.command, "upx");
        assert_eq!(config.store_path(), PathBuf::from("/srv/releases/versions.db"));
        assert_eq!(config.link_dir(), PathBuf::from("/srv/releases/bin"));

        let releases = config.releases().unwrap();
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].project, "cli");
        assert_eq!(releases[0].keep, Some(2));
        assert_eq!(releases[0].arch, "arm64");
        assert_eq!(releases[0].post_commands.len(), 1);
        assert_eq!(releases[1].source, "gitlab.com");
        assert_eq!(releases[1].requested_version, "v1.2.0");
        assert!(releases[1].download_only);
        assert_eq!(releases[1].os, "darwin");
    }

    #[test]
    fn session_settings_ignore_repo_list() {
        let base = Config::default();
        let mut more_repos = base.clone();
        more_repos.repos.push(RepoConfig::new("github.com/o/tool"));
        more_repos.keep = 7;
        assert!(base.same_session(&more_repos));

        let mut workers = base.clone();
        workers.workers += 1;
        assert!(!base.same_session(&workers));

        let mut shrink = base.clone();
        shrink.shrink.enabled = true;
        assert!(!base.same_session(&shrink));

        let mut moved = base.clone();
        moved.release_path = PathBuf::from("/srv/relsync");
        assert!(!base.same_session(&moved));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.workers, crate::download::DEFAULT_WORKERS);
        assert!(config.repos.is_empty());
        assert!(!config.shrink.enabled);
    }

    #[test]
    fn validate_rejects_bad_entries() {
        let mut config = Config::default();
        config.workers = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.repos.push(RepoConfig::new("cli/cli"));
        assert!(matches!(config.validate(), Err(RelsyncError::MalformedRepo(_))));

        let mut config = Config::default();
        config.repos.push(RepoConfig::new("github.com/a/b"));
        config.repos.push(RepoConfig::new("github.com/a/b"));
        assert!(config.validate().is_err());
    }
}
