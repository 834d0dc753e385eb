//! Shared fixtures for pipeline, orchestrator and cleanup tests.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::SyncContext;
use crate::download::Downloader;
use crate::source::{Asset, ReleaseSource, SourceError, SourceRegistry, SourceRelease, GITHUB};

/// In-memory source serving one fixed release per `org/project`.
#[derive(Default)]
pub(crate) struct FakeSource {
    releases: HashMap<String, SourceRelease>,
}

impl FakeSource {
    pub(crate) fn with(mut self, org: &str, project: &str, tag: &str, assets: Vec<Asset>) -> Self {
        self.releases.insert(
            format!("{org}/{project}"),
            SourceRelease {
                tag: tag.to_string(),
                notes: format!("notes for {tag}"),
                created_at: None,
                assets,
            },
        );
        self
    }
}

#[async_trait]
impl ReleaseSource for FakeSource {
    async fn latest(&self, org: &str, project: &str) -> Result<SourceRelease, SourceError> {
        let key = format!("{org}/{project}");
        self.releases
            .get(&key)
            .cloned()
            .ok_or(SourceError::NotFound(key))
    }

    async fn by_tag(
        &self,
        org: &str,
        project: &str,
        tag: &str,
    ) -> Result<SourceRelease, SourceError> {
        let found = self.latest(org, project).await?;
        if found.tag == tag {
            Ok(found)
        } else {
            Err(SourceError::NotFound(format!("{org}/{project}@{tag}")))
        }
    }
}

pub(crate) fn context(release_path: &Path, source: FakeSource) -> SyncContext {
    let sources = SourceRegistry::new().with(GITHUB, Arc::new(source));
    let downloader = Downloader::start(2, reqwest::Client::new());
    SyncContext::new(release_path.to_path_buf(), downloader, sources)
}

pub(crate) fn asset(server_url: &str, name: &str) -> Asset {
    Asset {
        name: name.to_string(),
        url: format!("{server_url}/{name}"),
    }
}

/// A gzipped tarball holding `<dir>/<name>` with a shell-script body.
pub(crate) fn tar_gz_with(dir: &str, name: &str) -> Vec<u8> {
    let body = b"#!/bin/sh\necho ok\n";
    let mut builder = tar::Builder::new(flate2::write::GzEncoder::new(
        Vec::new(),
        flate2::Compression::default(),
    ));
    let mut header = tar::Header::new_gnu();
    header.set_size(body.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, format!("{dir}/{name}"), &body[..])
        .unwrap();
    let mut encoder = builder.into_inner().unwrap();
    encoder.flush().unwrap();
    encoder.finish().unwrap()
}
