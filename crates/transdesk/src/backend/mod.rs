//! Remote translation service.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::{ReconcileError, SubmitError};

pub mod http;
pub mod types;

pub use http::HttpTranslationBackend;
pub use types::{
    FileTranslationRequest, Progress, RemoteStatus, SubmitResponse, TaskStatusReport,
    TextTranslationRequest,
};

#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Starts an asynchronous translation of a whole document.
    async fn submit_file(
        &self,
        request: &FileTranslationRequest<'_>,
        ticket: &SecretString,
    ) -> Result<SubmitResponse, SubmitError>;

    async fn job_status(&self, task_id: &str) -> Result<TaskStatusReport, ReconcileError>;

    /// Translates a snippet synchronously. `None` when the reply carries no result.
    async fn translate_text(
        &self,
        request: &TextTranslationRequest,
        ticket: &SecretString,
    ) -> Result<Option<String>, SubmitError>;
}
