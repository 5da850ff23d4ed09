//! Hash-structured key-value storage.
//!
//! A partition is one named hash of `field -> value` strings. Records,
//! projects and glossaries each live in their own partitions.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{DeploymentConfig, StoreConfig, StoreKind};

pub mod error;
pub mod memory;
mod migrations;
pub mod sqlite;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Field-level access to named partitions. Writes are single-field upserts.
pub trait RecordStore: Send + Sync {
    fn hset(&self, partition: &str, field: &str, value: &str) -> Result<(), StoreError>;

    fn hget(&self, partition: &str, field: &str) -> Result<Option<String>, StoreError>;

    /// All fields of a partition, ordered by field name.
    fn hgetall(&self, partition: &str) -> Result<Vec<(String, String)>, StoreError>;

    fn hexists(&self, partition: &str, field: &str) -> Result<bool, StoreError> {
        Ok(self.hget(partition, field)?.is_some())
    }

    fn hkeys(&self, partition: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .hgetall(partition)?
            .into_iter()
            .map(|(field, _)| field)
            .collect())
    }

    fn hvals(&self, partition: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .hgetall(partition)?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }
}

/// Partition naming for one deployment: `{app_code}:{environment}:...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    app_code: String,
    environment: String,
}

impl Namespace {
    pub fn new(app_code: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            app_code: app_code.into(),
            environment: environment.into(),
        }
    }

    pub fn from_config(config: &DeploymentConfig) -> Self {
        Self::new(&config.app_code, &config.environment)
    }

    /// Job records of one user within one project, keyed by submission time.
    pub fn records(&self, project: &str, user: &str) -> String {
        format!("{}:{}:record:{}:{}", self.app_code, self.environment, project, user)
    }

    /// Project directory, keyed by project name.
    pub fn projects(&self) -> String {
        format!("{}:{}:project", self.app_code, self.environment)
    }

    /// Glossaries of one project, keyed by glossary name.
    pub fn glossaries(&self, project: &str) -> String {
        format!("{}:{}:term:{}", self.app_code, self.environment, project)
    }
}

/// Returns the default SQLite path: `~/.transdesk/data/records.db`.
pub fn default_store_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".transdesk").join("data").join("records.db"))
}

/// Opens the store selected by configuration.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>, StoreError> {
    match config.kind {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::Sqlite => {
            let path = match &config.path {
                Some(path) => PathBuf::from(crate::secrets::expand_home(path)),
                None => default_store_path().ok_or(StoreError::NoDefaultPath)?,
            };
            Ok(Arc::new(SqliteStore::open(&path)?))
        }
    }
}
