use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    #[error("Record store lock poisoned")]
    LockPoisoned,

    #[error("No home directory for the default store path")]
    NoDefaultPath,

    /// A stored value could not be decoded or encoded.
    #[error("Corrupt value in '{partition}' at '{field}': {reason}")]
    Corrupt {
        partition: String,
        field: String,
        reason: String,
    },
}
