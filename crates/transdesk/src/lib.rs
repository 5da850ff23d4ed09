pub mod artifact;
pub mod backend;
pub mod config;
pub mod desk;
pub mod diff;
pub mod error;
pub mod glossary;
pub mod normalizer;
pub mod project;
pub mod reconciler;
pub mod record;
pub mod secrets;
pub mod session;
pub mod store;
pub mod submission;
pub mod telemetry;

pub use artifact::{ArtifactQuery, ArtifactStore, HttpArtifactStore};
pub use backend::{HttpTranslationBackend, TranslationBackend};
pub use config::{load_config, Config};
pub use desk::{Desk, Notice, NoticeLevel, Reply, SubmitOptions, TextTranslation, Upload};
pub use diff::{diff, TextDiff};
pub use error::{
    ArtifactError, ConfigError, NormalizeError, ReconcileError, Result, SubmitError,
    TransdeskError,
};
pub use normalizer::{classify, normalize, DocumentKind, Normalizer};
pub use reconciler::{Reconciliation, StatusReconciler};
pub use record::{JobRecord, JobStatus, RecordKey, RecordRepository, SubmittedAt};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use session::{AuthError, Session};
pub use store::{open_store, MemoryStore, RecordStore, SqliteStore, StoreError};
pub use telemetry::init_logging;
