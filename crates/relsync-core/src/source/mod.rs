//! Release sources: the normalized "query a release" capability.
//!
//! The pipeline only ever sees [`ReleaseSource`]; the GitHub and GitLab
//! clients translate their REST payloads into [`SourceRelease`].

pub mod github;
pub mod gitlab;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::error::{RelsyncError, Result};

pub use github::GithubSource;
pub use gitlab::GitlabSource;

pub const GITHUB: &str = "github.com";
pub const GITLAB: &str = "gitlab.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct SourceRelease {
    pub tag: String,
    pub notes: String,
    pub created_at: Option<DateTime<Utc>>,
    pub assets: Vec<Asset>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("release not found: {0}")]
    NotFound(String),

    #[error("{url} returned HTTP {status}")]
    Http { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn latest(&self, org: &str, project: &str) -> std::result::Result<SourceRelease, SourceError>;

    async fn by_tag(
        &self,
        org: &str,
        project: &str,
        tag: &str,
    ) -> std::result::Result<SourceRelease, SourceError>;
}

/// Maps a source identifier (`github.com`, `gitlab.com`) to its client.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn ReleaseSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the public GitHub and GitLab clients. Tokens are read from
    /// `GITHUB_TOKEN` and `GITLAB_TOKEN` when set.
    pub fn with_defaults(client: reqwest::Client) -> Self {
        let github = GithubSource::new(client.clone(), github::API_URL)
            .with_token(std::env::var("GITHUB_TOKEN").ok());
        let gitlab = GitlabSource::new(client, gitlab::API_URL)
            .with_token(std::env::var("GITLAB_TOKEN").ok());
        Self::new()
            .with(GITHUB, Arc::new(github))
            .with(GITLAB, Arc::new(gitlab))
    }

    pub fn with(mut self, id: impl Into<String>, source: Arc<dyn ReleaseSource>) -> Self {
        self.sources.insert(id.into(), source);
        self
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn ReleaseSource>> {
        self.sources
            .get(id)
            .cloned()
            .ok_or_else(|| RelsyncError::UnsupportedSource(id.to_string()))
    }
}

/// HTTP client shared by the sources and the download pool.
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("relsync/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Shared response handling: 404 is `NotFound`, other non-2xx is `Http`.
pub(crate) async fn fetch_json<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
    url: &str,
    what: &str,
) -> std::result::Result<T, SourceError> {
    let transport = |source| SourceError::Transport {
        url: url.to_string(),
        source,
    };
    let response = request.send().await.map_err(transport)?;
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        return Err(SourceError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    response.json::<T>().await.map_err(transport)
}
