//! Status reconciliation for submitted jobs.
//!
//! The artifact store is the source of truth for completion: a published
//! artifact means SUCCESS whatever the backend reports. Without one, a job
//! id is required to ask the backend; a record without an id cannot be
//! tracked and reads as UNKNOWN.

use std::sync::Arc;

use tracing::Instrument;

use crate::artifact::{ArtifactQuery, ArtifactStore};
use crate::backend::{Progress, RemoteStatus, TranslationBackend};
use crate::config::ArtifactConfig;
use crate::error::ReconcileError;
use crate::record::{JobRecord, JobStatus, RecordKey, RecordRepository};

pub const MISSING_JOB_ID_MESSAGE: &str =
    "The backend never returned a job id for this record; its status cannot be tracked.";
pub const BACKLOG_MESSAGE: &str = "Translation task queued; the queue may be backlogged.";

/// Status derived from the external systems, before merging with the stored one.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub status: JobStatus,
    pub progress: Option<Progress>,
    pub message: Option<String>,
}

impl Derivation {
    fn status(status: JobStatus) -> Self {
        Self {
            status,
            progress: None,
            message: None,
        }
    }

    fn with_message(status: JobStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            progress: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// No record under the key; nothing was written.
    NoRecord,
    Updated {
        record: JobRecord,
        derivation: Derivation,
    },
}

impl Reconciliation {
    pub fn status(&self) -> Option<JobStatus> {
        match self {
            Reconciliation::NoRecord => None,
            Reconciliation::Updated { record, .. } => Some(record.status),
        }
    }
}

/// Combines the stored and derived statuses. A terminal status never falls
/// back to a non-terminal one; FAILURE yields to SUCCESS.
pub fn merge_status(stored: JobStatus, derived: JobStatus) -> JobStatus {
    match (stored, derived) {
        (JobStatus::Failure, JobStatus::Success) => JobStatus::Success,
        (stored, _) if stored.is_terminal() => stored,
        (_, derived) => derived,
    }
}

#[derive(Clone)]
pub struct StatusReconciler {
    records: RecordRepository,
    backend: Arc<dyn TranslationBackend>,
    artifacts: Arc<dyn ArtifactStore>,
    artifact_config: ArtifactConfig,
}

impl StatusReconciler {
    pub fn new(
        records: RecordRepository,
        backend: Arc<dyn TranslationBackend>,
        artifacts: Arc<dyn ArtifactStore>,
        artifact_config: ArtifactConfig,
    ) -> Self {
        Self {
            records,
            backend,
            artifacts,
            artifact_config,
        }
    }

    /// Derives a status from the artifact store and the backend.
    pub async fn derive(&self, record: &JobRecord) -> Result<Derivation, ReconcileError> {
        let query = ArtifactQuery::for_file(&self.artifact_config, &record.file_name);
        let search = self.artifacts.search(&query).await;

        let job_id = match (search, record.remote_job_id.as_deref()) {
            (Ok(found), _) if found.found() => {
                return Ok(Derivation::status(JobStatus::Success));
            }
            (Err(e), None) => {
                log::warn!(
                    "Artifact lookup for '{}' failed and no job id is stored: {}",
                    record.file_name,
                    e
                );
                return Ok(Derivation::with_message(JobStatus::Unknown, MISSING_JOB_ID_MESSAGE));
            }
            (Ok(_), None) => {
                return Ok(Derivation::with_message(JobStatus::Unknown, MISSING_JOB_ID_MESSAGE));
            }
            (Err(e), Some(_)) => return Err(e.into()),
            (Ok(_), Some(id)) => id,
        };

        let report = self.backend.job_status(job_id).await?;
        let derivation = match report.status {
            RemoteStatus::Progress => Derivation {
                status: JobStatus::Progress,
                progress: report.progress,
                message: None,
            },
            RemoteStatus::Failure => Derivation::status(JobStatus::Failure),
            RemoteStatus::Success => {
                log::info!(
                    "Job {} reports SUCCESS but '{}' is not published yet",
                    job_id,
                    record.file_name
                );
                Derivation::with_message(JobStatus::Pending, BACKLOG_MESSAGE)
            }
            RemoteStatus::Pending | RemoteStatus::Other(_) => {
                Derivation::with_message(JobStatus::Pending, BACKLOG_MESSAGE)
            }
        };
        Ok(derivation)
    }

    /// Re-derives the status of the record under `key` and writes it back.
    pub async fn reconcile(&self, key: &RecordKey) -> Result<Reconciliation, ReconcileError> {
        let span = tracing::info_span!("reconciler.reconcile", key = %key);
        async {
            let Some(mut record) = self.records.load(key)? else {
                log::debug!("No record for {}", key);
                return Ok(Reconciliation::NoRecord);
            };

            let derivation = self.derive(&record).await?;
            let merged = merge_status(record.status, derivation.status);
            if merged != record.status {
                log::info!("{}: {} -> {}", key, record.status, merged);
            }

            record.status = merged;
            self.records.save(key, &record)?;

            Ok(Reconciliation::Updated { record, derivation })
        }
        .instrument(span)
        .await
    }
}
