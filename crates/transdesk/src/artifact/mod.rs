//! Repository holding translated documents.
//!
//! A finished job publishes `{target_path}{file_name}` into a fixed project
//! and repository. Lookup is by file name only, so an older artifact with
//! the same name also counts as a match.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ArtifactConfig;
use crate::error::ArtifactError;

pub mod http;

pub use http::HttpArtifactStore;

/// Exact-match search for one file in the target folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactQuery {
    pub project: String,
    pub repo: String,
    pub path: String,
    pub file_name: String,
}

impl ArtifactQuery {
    pub fn for_file(config: &ArtifactConfig, file_name: &str) -> Self {
        Self {
            project: config.project.clone(),
            repo: config.repo.clone(),
            path: config.target_path.clone(),
            file_name: file_name.to_string(),
        }
    }

    /// Where the matching artifact is downloaded from.
    pub fn location(&self) -> ArtifactLocation {
        ArtifactLocation {
            project: self.project.clone(),
            repo: self.repo.clone(),
            path: format!("{}{}", self.path.trim_start_matches('/'), self.file_name),
        }
    }
}

/// `{project}/{repo}/{path}` of one stored file; `path` has no leading slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    pub project: String,
    pub repo: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactNode {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub last_modified_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArtifactSearch {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub records: Vec<ArtifactNode>,
}

impl ArtifactSearch {
    pub fn found(&self) -> bool {
        self.count > 0
    }
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn search(&self, query: &ArtifactQuery) -> Result<ArtifactSearch, ArtifactError>;

    async fn download(&self, location: &ArtifactLocation) -> Result<Vec<u8>, ArtifactError>;
}
