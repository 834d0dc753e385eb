use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Installed-version metadata stored under `source/org/project/version/data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub version: String,
    pub os: String,
    pub arch: String,
    #[serde(default)]
    pub source: String,
    pub org: String,
    pub project: String,
    pub repo: String,
    #[serde(default)]
    pub artifact_path: String,
    pub publish_path: String,
    #[serde(default)]
    pub link_path: String,
    #[serde(default)]
    pub asset_name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl VersionRecord {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
