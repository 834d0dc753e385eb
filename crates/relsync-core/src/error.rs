use thiserror::Error;

use crate::source::SourceError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum RelsyncError {
    #[error("malformed repo '{0}': expected <source>/<org>/<project>")]
    MalformedRepo(String),

    #[error("unsupported source '{0}'")]
    UnsupportedSource(String),

    #[error("no asset of {repo}@{tag} matches {wanted}")]
    NoMatchingAsset {
        repo: String,
        tag: String,
        wanted: String,
    },

    #[error("release tag '{tag}' of {repo} cannot be used as a path segment")]
    InvalidTag { repo: String, tag: String },

    #[error("release has not been resolved yet: {0} is missing")]
    Unresolved(&'static str),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("GET {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("artifact '{name}' not found under {root}")]
    ArtifactNotFound { name: String, root: String },

    #[error("failed to extract {path}: {reason}")]
    Archive { path: String, reason: String },

    #[error("template error in '{template}': {reason}")]
    Template { template: String, reason: String },

    #[error("post command `{command}` failed: {reason}")]
    PostCommand { command: String, reason: String },

    #[error("shrink tool '{0}' not found on PATH")]
    ShrinkToolMissing(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid version '{version}' recorded for {repo}")]
    InvalidVersion { repo: String, version: String },

    #[error("download pool is shut down")]
    PoolClosed,

    #[error("cancelled")]
    Cancelled,

    #[error("release task failed: {0}")]
    TaskFailed(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RelsyncError>;
