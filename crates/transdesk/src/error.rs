use std::path::PathBuf;
use thiserror::Error;

use crate::normalizer::DocumentKind;

#[derive(Error, Debug)]
pub enum TransdeskError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Normalization error: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("Submission error: {0}")]
    Submit(#[from] SubmitError),

    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Artifact store error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Record store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    #[error("Glossary error: {0}")]
    Glossary(#[from] GlossaryError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),

    #[error("Authentication error: {0}")]
    Auth(#[from] crate::session::AuthError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid value for environment variable '{name}': {reason}")]
    InvalidEnv { name: String, reason: String },
}

/// Failure to flatten an uploaded document into plain text.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Unsupported document type for '{filename}'")]
    Unsupported { filename: String },

    #[error("Failed to read {kind} document '{filename}': {reason}")]
    Malformed {
        kind: DocumentKind,
        filename: String,
        reason: String,
    },
}

impl NormalizeError {
    pub(crate) fn malformed(kind: DocumentKind, reason: impl Into<String>) -> Self {
        Self::Malformed {
            kind,
            filename: String::new(),
            reason: reason.into(),
        }
    }

    /// Attaches the uploaded filename to an error raised below the upload boundary.
    pub fn with_filename(self, name: &str) -> Self {
        match self {
            Self::Unsupported { .. } => Self::Unsupported {
                filename: name.to_string(),
            },
            Self::Malformed { kind, reason, .. } => Self::Malformed {
                kind,
                filename: name.to_string(),
                reason,
            },
        }
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Unsupported { .. } => DocumentKind::Unknown,
            Self::Malformed { kind, .. } => *kind,
        }
    }
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Translation backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Translation backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Translation backend response had no job id")]
    MissingJobId,

    #[error("Failed to encode request: {0}")]
    Encode(String),
}

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Artifact store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Artifact store returned status {status}")]
    Status { status: u16 },

    #[error("Artifact store rejected the request: {message}")]
    Rejected { message: String },

    #[error("Failed to parse artifact store response: {0}")]
    Parse(String),

    #[error("Invalid artifact store URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Project name must not be empty")]
    EmptyName,

    #[error("Project '{name}' already exists")]
    AlreadyExists { name: String },

    #[error("Users not allowed as project members: {}", .names.join(", "))]
    MembersNotAllowed { names: Vec<String> },

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}

#[derive(Error, Debug)]
pub enum GlossaryError {
    #[error("Glossary '{name}' must be an .xlsx spreadsheet")]
    Unsupported { name: String },

    #[error("Glossary '{name}' has no term rows")]
    Empty { name: String },

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}

/// Failure while deriving a job status. Callers downgrade this to UNKNOWN.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Artifact lookup failed: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Job status request failed: {0}")]
    Backend(String),

    #[error("Failed to persist reconciled status: {0}")]
    Store(#[from] crate::store::StoreError),
}

impl From<reqwest::Error> for ReconcileError {
    fn from(err: reqwest::Error) -> Self {
        ReconcileError::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TransdeskError>;
