//! One tracked artifact moving through the sync pipeline.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::error::{RelsyncError, Result};
use crate::pipeline::Phase;
use crate::record::VersionRecord;
use crate::source::Asset;
use crate::template::TemplateData;

pub const LATEST: &str = "latest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryType {
    Latest,
    ByTag(String),
}

impl QueryType {
    pub fn from_requested(version: &str) -> Self {
        if version.is_empty() || version.eq_ignore_ascii_case(LATEST) {
            Self::Latest
        } else {
            Self::ByTag(version.to_string())
        }
    }
}

/// Host platform in the vocabulary release assets usually use.
pub fn host_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}

#[derive(Debug, Clone)]
pub struct Release {
    // identity
    pub source: String,
    pub org: String,
    pub project: String,

    // request
    pub requested_version: String,
    pub query: QueryType,
    /// Explicit asset filename (template).
    pub file: Option<String>,
    /// External download URL (template), bypasses asset selection.
    pub url: Option<String>,
    pub link_name: Option<String>,
    /// Executable name to look for inside an unpacked archive (template).
    pub artifact: Option<String>,
    pub os: String,
    pub arch: String,

    // resolved
    pub version: Option<String>,
    pub asset_name: Option<String>,
    pub download_url: Option<String>,
    pub release_notes: String,
    pub created_at: Option<DateTime<Utc>>,
    pub assets: Vec<Asset>,

    // filesystem
    pub publish_path: Option<PathBuf>,
    pub artifact_path: Option<PathBuf>,
    pub link_path: Option<PathBuf>,
    pub link_dir: Option<PathBuf>,

    // flags
    pub download_only: bool,
    pub post_only: bool,
    pub cleanup_on_failure: bool,
    pub shrink: Option<bool>,
    pub keep: Option<usize>,

    pub post_commands: Vec<Vec<String>>,
    pub phase: Phase,
}

impl Release {
    /// Build a release from a `source/org/project` identifier and a requested
    /// version (`latest` or a tag).
    pub fn new(repo: &str, requested_version: &str) -> Result<Self> {
        let (source, org, project) = parse_repo(repo)?;
        Ok(Self {
            source,
            org,
            project,
            requested_version: requested_version.to_string(),
            query: QueryType::from_requested(requested_version),
            file: None,
            url: None,
            link_name: None,
            artifact: None,
            os: host_os().to_string(),
            arch: host_arch().to_string(),
            version: None,
            asset_name: None,
            download_url: None,
            release_notes: String::new(),
            created_at: None,
            assets: Vec::new(),
            publish_path: None,
            artifact_path: None,
            link_path: None,
            link_dir: None,
            download_only: false,
            post_only: false,
            cleanup_on_failure: false,
            shrink: None,
            keep: None,
            post_commands: Vec::new(),
            phase: Phase::Resolve,
        })
    }

    pub fn repo(&self) -> String {
        format!("{}/{}/{}", self.source, self.org, self.project)
    }

    /// Resolved tag, or `Unresolved` if Query has not run.
    pub fn tag(&self) -> Result<&str> {
        self.version
            .as_deref()
            .ok_or(RelsyncError::Unresolved("version"))
    }

    /// Tag without a leading `v`, the form most asset names embed.
    pub fn bare_version(&self) -> &str {
        let tag = self.version.as_deref().unwrap_or_default();
        tag.strip_prefix('v').unwrap_or(tag)
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    pub fn template_data(&self) -> TemplateData {
        TemplateData::new()
            .with("Version", self.bare_version())
            .with("Tag", self.version.clone().unwrap_or_default())
            .with("OS", self.os.clone())
            .with("Arch", self.arch.clone())
            .with("Source", self.source.clone())
            .with("Org", self.org.clone())
            .with("Project", self.project.clone())
            .with("AssetName", self.asset_name.clone().unwrap_or_default())
            .with("PublishPath", path_str(&self.publish_path))
            .with("ArtifactPath", path_str(&self.artifact_path))
            .with("LinkPath", path_str(&self.link_path))
    }

    /// Metadata persisted in the version store after a successful sync.
    pub fn record(&self) -> Result<VersionRecord> {
        Ok(VersionRecord {
            version: self.tag()?.to_string(),
            os: self.os.clone(),
            arch: self.arch.clone(),
            source: self.source.clone(),
            org: self.org.clone(),
            project: self.project.clone(),
            repo: self.repo(),
            artifact_path: path_str(&self.artifact_path),
            publish_path: path_str(&self.publish_path),
            link_path: if self.download_only || self.post_only {
                String::new()
            } else {
                path_str(&self.link_path)
            },
            asset_name: self.asset_name.clone().unwrap_or_default(),
            created_at: self.created_at,
        })
    }

    pub fn publish_dir(&self, release_path: &Path) -> Result<PathBuf> {
        Ok(crate::paths::publish_dir(
            release_path,
            &self.source,
            &self.org,
            &self.project,
            self.tag()?,
        ))
    }
}

fn path_str(p: &Option<PathBuf>) -> String {
    p.as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

/// Split `source/org/project`. Surrounding slashes are ignored; any other
/// segment count is malformed.
pub fn parse_repo(repo: &str) -> Result<(String, String, String)> {
    let parts: Vec<&str> = repo.trim_matches('/').split('/').collect();
    match parts.as_slice() {
        [source, org, project] if !source.is_empty() && !org.is_empty() && !project.is_empty() => {
            Ok((source.to_string(), org.to_string(), project.to_string()))
        }
        _ => Err(RelsyncError::MalformedRepo(repo.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_repo_requires_three_segments() {
        let (s, o, p) = parse_repo("github.com/cli/cli").unwrap();
        assert_eq!((s.as_str(), o.as_str(), p.as_str()), ("github.com", "cli", "cli"));
        assert!(parse_repo("cli/cli").is_err());
        assert!(parse_repo("github.com/a/b/c").is_err());
        assert!(parse_repo("github.com//cli").is_err());
    }

    #[test]
    fn requested_version_picks_query_type() {
        assert_eq!(QueryType::from_requested("latest"), QueryType::Latest);
        assert_eq!(QueryType::from_requested(""), QueryType::Latest);
        assert_eq!(
            QueryType::from_requested("v1.2.3"),
            QueryType::ByTag("v1.2.3".into())
        );
    }

    #[test]
    fn template_data_strips_leading_v() {
        let mut r = Release::new("github.com/o/p", "latest").unwrap();
        r.version = Some("v1.4.0".into());
        let data = r.template_data();
        assert_eq!(data.get("Version"), Some("1.4.0"));
        assert_eq!(data.get("Tag"), Some("v1.4.0"));
        assert_eq!(data.get("Project"), Some("p"));
    }

    #[test]
    fn record_omits_link_when_nothing_is_linked() {
        let mut r = Release::new("github.com/o/p", "latest").unwrap();
        r.version = Some("v1.0.0".into());
        r.link_path = Some(PathBuf::from("/bin/p"));
        assert_eq!(r.record().unwrap().link_path, "/bin/p");

        r.download_only = true;
        assert_eq!(r.record().unwrap().link_path, "");
        r.download_only = false;
        r.post_only = true;
        assert_eq!(r.record().unwrap().link_path, "");
    }

    #[test]
    fn record_requires_resolved_version() {
        let r = Release::new("github.com/o/p", "latest").unwrap();
        assert!(matches!(r.record(), Err(RelsyncError::Unresolved(_))));
    }
}
