use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{fetch_json, Asset, ReleaseSource, SourceError, SourceRelease};

pub const API_URL: &str = "https://gitlab.com/api/v4";

#[derive(Debug, Deserialize)]
struct GitlabLink {
    name: String,
    url: String,
    #[serde(default)]
    direct_asset_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GitlabAssets {
    #[serde(default)]
    links: Vec<GitlabLink>,
}

#[derive(Debug, Deserialize)]
struct GitlabRelease {
    tag_name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    released_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    assets: GitlabAssets,
}

impl From<GitlabRelease> for SourceRelease {
    fn from(r: GitlabRelease) -> Self {
        Self {
            tag: r.tag_name,
            notes: r.description.unwrap_or_default(),
            created_at: r.released_at.or(r.created_at),
            assets: r
                .assets
                .links
                .into_iter()
                .map(|l| Asset {
                    name: l.name,
                    url: l.direct_asset_url.unwrap_or(l.url),
                })
                .collect(),
        }
    }
}

pub struct GitlabSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

/// GitLab addresses projects by their URL-encoded full path.
fn project_id(org: &str, project: &str) -> String {
    format!("{org}%2F{project}")
}

impl GitlabSource {
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
        let mut request = self.client.get(&url).header("User-Agent", "relsync");
        if let Some(token) = &self.token {
            request = request.header("PRIVATE-TOKEN", token);
        }
        let release: GitlabRelease = fetch_json(request, &url, &what).await?;
        Ok(release.into())
    }
}

#[async_trait]
impl ReleaseSource for GitlabSource {
    async fn latest(&self, org: &str, project: &str) -> Result<SourceRelease, SourceError> {
        let url = format!(
            "{}/projects/{}/releases/permalink/latest",
            self.base_url,
            project_id(org, project)
        );
        self.fetch(url, format!("{org}/{project}@latest")).await
    }

    async fn by_tag(
        &self,
        org: &str,
        project: &str,
        tag: &str,
    ) -> Result<SourceRelease, SourceError> {
        let url = format!(
            "{}/projects/{}/releases/{tag}",
            self.base_url,
            project_id(org, project)
        );
        self.fetch(url, format!("{org}/{project}@{tag}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn by_tag_prefers_direct_asset_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/projects/grp.+tool/releases/v1\.0\.0$".into()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"tag_name":"v1.0.0","description":"notes","released_at":"2024-01-02T00:00:00Z",
                    "assets":{"links":[
                        {"name":"tool-linux-amd64","url":"https://x/link","direct_asset_url":"https://x/direct"},
                        {"name":"tool-darwin-arm64","url":"https://x/mac"}
                    ]}}"#,
            )
            .create_async()
            .await;

        let source = GitlabSource::new(reqwest::Client::new(), server.url());
        let release = source.by_tag("grp", "tool", "v1.0.0").await.unwrap();
        assert_eq!(release.notes, "notes");
        assert_eq!(release.assets[0].url, "https://x/direct");
        assert_eq!(release.assets[1].url, "https://x/mac");
    }
}
