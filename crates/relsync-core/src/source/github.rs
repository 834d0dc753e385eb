use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{fetch_json, Asset, ReleaseSource, SourceError, SourceRelease};

pub const API_URL: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
}

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    body: Option<String>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

impl From<GithubRelease> for SourceRelease {
    fn from(r: GithubRelease) -> Self {
        Self {
            tag: r.tag_name,
            notes: r.body.unwrap_or_default(),
            created_at: r.published_at.or(r.created_at),
            assets: r
                .assets
                .into_iter()
                .map(|a| Asset {
                    name: a.name,
                    url: a.browser_download_url,
                })
                .collect(),
        }
    }
}

pub struct GithubSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GithubSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    async fn fetch(&self, url: String, what: String) -> Result<SourceRelease, SourceError> {
        let mut request = self
            .client
            .get(&url)
            .header("User-Agent", "relsync")
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let release: GithubRelease = fetch_json(request, &url, &what).await?;
        Ok(release.into())
    }
}

#[async_trait]
impl ReleaseSource for GithubSource {
    async fn latest(&self, org: &str, project: &str) -> Result<SourceRelease, SourceError> {
        let url = format!("{}/repos/{org}/{project}/releases/latest", self.base_url);
        self.fetch(url, format!("{org}/{project}@latest")).await
    }

    async fn by_tag(
        &self,
        org: &str,
        project: &str,
        tag: &str,
    ) -> Result<SourceRelease, SourceError> {
        let url = format!(
            "{}/repos/{org}/{project}/releases/tags/{tag}",
            self.base_url
        );
        self.fetch(url, format!("{org}/{project}@{tag}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELEASE_JSON: &str = r#"{
        "tag_name": "v2.4.0",
        "body": "changes",
        "published_at": "2024-03-01T10:00:00Z",
        "assets": [
            {"name": "gh_2.4.0_linux_amd64.tar.gz", "browser_download_url": "https://dl/gh.tgz"}
        ]
    }"#;

    #[tokio::test]
    async fn latest_maps_release_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/cli/cli/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(RELEASE_JSON)
            .create_async()
            .await;

        let source = GithubSource::new(reqwest::Client::new(), server.url());
        let release = source.latest("cli", "cli").await.unwrap();
        mock.assert_async().await;

        assert_eq!(release.tag, "v2.4.0");
        assert_eq!(release.notes, "changes");
        assert!(release.created_at.is_some());
        assert_eq!(release.assets.len(), 1);
        assert_eq!(release.assets[0].url, "https://dl/gh.tgz");
    }

    #[tokio::test]
    async fn missing_tag_is_not_found_not_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/cli/cli/releases/tags/v9.9.9")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/cli/cli/releases/latest")
            .with_status(502)
            .create_async()
            .await;

        let source = GithubSource::new(reqwest::Client::new(), server.url());
        let err = source.by_tag("cli", "cli", "v9.9.9").await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)), "got: {err}");
        let err = source.latest("cli", "cli").await.unwrap_err();
        assert!(matches!(err, SourceError::Http { status: 502, .. }), "got: {err}");
    }
}
