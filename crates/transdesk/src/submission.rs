//! One-shot job submission.
//!
//! Every failure mode collapses into [`SubmitOutcome::NoJobId`] so the caller
//! can still persist a record for the attempt.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::Instrument;

use crate::backend::{FileTranslationRequest, TranslationBackend};
use crate::error::SubmitError;
use crate::normalizer::DocumentKind;
use crate::record::TranslationParams;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { job_id: String },
    /// The backend did not hand out a job id; the reason is for display.
    NoJobId { reason: String },
}

impl SubmitOutcome {
    pub fn job_id(&self) -> Option<&str> {
        match self {
            SubmitOutcome::Accepted { job_id } => Some(job_id),
            SubmitOutcome::NoJobId { .. } => None,
        }
    }
}

/// A document ready to be sent: classified, normalized and parameterized.
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    pub kind: DocumentKind,
    pub file_name: &'a str,
    pub plain_text: &'a str,
    pub raw_bytes: &'a [u8],
    pub params: &'a TranslationParams,
}

#[derive(Clone)]
pub struct SubmissionClient {
    backend: Arc<dyn TranslationBackend>,
}

impl SubmissionClient {
    pub fn new(backend: Arc<dyn TranslationBackend>) -> Self {
        Self { backend }
    }

    /// Sends the document once. No retries.
    pub async fn submit(&self, submission: &Submission<'_>, ticket: &SecretString) -> SubmitOutcome {
        let span = tracing::info_span!(
            "submission.submit",
            file = %submission.file_name,
            kind = %submission.kind
        );

        let request = FileTranslationRequest {
            file_name: submission.file_name,
            kind: submission.kind,
            bytes: submission.raw_bytes,
            params: submission.params,
        };

        let result = self
            .backend
            .submit_file(&request, ticket)
            .instrument(span)
            .await
            .and_then(|response| response.task_id.ok_or(SubmitError::MissingJobId));

        match result {
            Ok(job_id) => {
                log::info!(
                    "Submitted '{}' ({} chars of source text) as job {}",
                    submission.file_name,
                    submission.plain_text.chars().count(),
                    job_id
                );
                SubmitOutcome::Accepted { job_id }
            }
            Err(e) => {
                log::warn!("Submission of '{}' got no job id: {}", submission.file_name, e);
                SubmitOutcome::NoJobId {
                    reason: e.to_string(),
                }
            }
        }
    }
}
