//! User-facing actions.
//!
//! Each action returns its value together with notices for display. Failures
//! of one action become error notices; none of them ends the session.

use std::sync::Arc;

use serde::Serialize;

use crate::artifact::{ArtifactQuery, ArtifactStore, HttpArtifactStore};
use crate::backend::{HttpTranslationBackend, Progress, TextTranslationRequest, TranslationBackend};
use crate::config::{ArtifactConfig, Config, UiConfig};
use crate::diff::{diff, TextDiff};
use crate::error::ProjectError;
use crate::glossary::{GlossaryBook, GlossaryImport};
use crate::normalizer::{classify, DocumentKind, Normalizer};
use crate::project::{Project, ProjectDirectory};
use crate::reconciler::{Reconciliation, StatusReconciler};
use crate::record::{JobRecord, JobStatus, RecordKey, RecordRepository, SubmittedAt, TranslationParams};
use crate::session::Session;
use crate::store::{open_store, Namespace, RecordStore};
use crate::submission::{Submission, SubmissionClient, SubmitOutcome};

/// Placeholder shown when text translation yields nothing.
pub const NO_RESPONSE: &str = "no response";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Result of a desk action.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub value: T,
    pub notices: Vec<Notice>,
}

impl<T> Reply<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            notices: Vec::new(),
        }
    }

    fn with(value: T, notice: Notice) -> Self {
        Self {
            value,
            notices: vec![notice],
        }
    }

    fn with_notices(value: T, notices: Vec<Notice>) -> Self {
        Self { value, notices }
    }

    fn notice(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }

    pub fn has_errors(&self) -> bool {
        self.notices.iter().any(|n| n.level == NoticeLevel::Error)
    }
}

/// An uploaded file.
#[derive(Debug, Clone, Copy)]
pub struct Upload<'a> {
    pub file_name: &'a str,
    pub bytes: &'a [u8],
}

/// Choices made alongside an upload.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub project: String,
    pub translate_type: String,
    pub terms: Vec<String>,
}

/// Output of a text translation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextTranslation {
    pub text: String,
    /// ISO 639-3 code of the input's language, if one could be detected.
    pub source_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub key: RecordKey,
    pub status: JobStatus,
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub submitted_at: String,
    pub file_name: String,
    pub status: JobStatus,
}

/// Status after a refresh. `status` is `None` when no record exists.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub key: RecordKey,
    pub status: Option<JobStatus>,
    pub progress: Option<Progress>,
}

/// A finished translation ready for download and review.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub diff: TextDiff,
}

fn detect_language(text: &str) -> Option<String> {
    let info = whatlang::detect(text)?;
    log::debug!(
        "Detected {} (confidence {:.2})",
        info.lang().eng_name(),
        info.confidence()
    );
    Some(info.lang().code().to_string())
}

pub struct Desk {
    ui: UiConfig,
    artifact_config: ArtifactConfig,
    normalizer: Normalizer,
    records: RecordRepository,
    projects: ProjectDirectory,
    glossaries: GlossaryBook,
    submission: SubmissionClient,
    reconciler: StatusReconciler,
    backend: Arc<dyn TranslationBackend>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl Desk {
    pub fn new(
        config: &Config,
        store: Arc<dyn RecordStore>,
        backend: Arc<dyn TranslationBackend>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        let namespace = Namespace::from_config(&config.deployment);
        let records = RecordRepository::new(store.clone(), namespace.clone());

        Self {
            ui: config.ui.clone(),
            artifact_config: config.artifacts.clone(),
            normalizer: Normalizer::new(&config.normalizer),
            projects: ProjectDirectory::new(store.clone(), namespace.clone()),
            glossaries: GlossaryBook::new(store, namespace),
            submission: SubmissionClient::new(backend.clone()),
            reconciler: StatusReconciler::new(
                records.clone(),
                backend.clone(),
                artifacts.clone(),
                config.artifacts.clone(),
            ),
            records,
            backend,
            artifacts,
        }
    }

    /// Wires the configured store and HTTP clients.
    pub fn from_config(config: &Config) -> crate::error::Result<Self> {
        let store = open_store(&config.store)?;
        let backend = Arc::new(HttpTranslationBackend::new(&config.backend)?);
        let artifacts = Arc::new(HttpArtifactStore::new(&config.artifacts)?);
        Ok(Self::new(config, store, backend, artifacts))
    }

    pub fn ui(&self) -> &UiConfig {
        &self.ui
    }

    pub fn projects_for(&self, session: &Session) -> Reply<Vec<String>> {
        match self.projects.projects_for(session.username()) {
            Ok(projects) => Reply::new(projects.into_iter().map(|p| p.project_name).collect()),
            Err(e) => {
                log::error!("Failed to list projects for {}: {}", session.username(), e);
                Reply::with(Vec::new(), Notice::error(format!("Could not load projects: {}", e)))
            }
        }
    }

    /// Creates a project. Members must come from the configured allow-list.
    pub fn create_project(
        &self,
        session: &Session,
        name: &str,
        members: &[String],
    ) -> Reply<Option<Project>> {
        let not_allowed: Vec<String> = members
            .iter()
            .filter(|m| m.as_str() != session.username() && !self.ui.members.contains(m))
            .cloned()
            .collect();

        let result = if not_allowed.is_empty() {
            self.projects.create(name, session.username(), members)
        } else {
            Err(ProjectError::MembersNotAllowed { names: not_allowed })
        };

        match result {
            Ok(project) => Reply::with(Some(project), Notice::success("Created")),
            Err(e) => Reply::with(None, Notice::error(e.to_string())),
        }
    }

    pub fn glossary_names(&self, project: &str) -> Reply<Vec<String>> {
        match self.glossaries.names(project) {
            Ok(names) => Reply::new(names),
            Err(e) => Reply::with(Vec::new(), Notice::error(format!("Could not load glossaries: {}", e))),
        }
    }

    pub fn upload_glossary(
        &self,
        session: &Session,
        project: &str,
        name: &str,
        bytes: &[u8],
    ) -> Reply<Option<GlossaryImport>> {
        if project.is_empty() {
            return Reply::with(None, Notice::warning("Select a project first"));
        }

        match self.glossaries.import(project, name, bytes) {
            Ok(import) => {
                log::info!("{} uploaded glossary '{}' to '{}'", session.username(), name, project);
                let notice = if import.overwritten {
                    Notice::warning(format!("{} was overwritten", name))
                } else {
                    Notice::success("Uploaded")
                };
                Reply::with(Some(import), notice)
            }
            Err(e) => Reply::with(None, Notice::error(e.to_string())),
        }
    }

    /// Translates text synchronously. Empty input makes no call.
    pub async fn translate_text(
        &self,
        session: &Session,
        request: &TextTranslationRequest,
    ) -> Reply<TextTranslation> {
        if request.text.is_empty() {
            return Reply::with(TextTranslation::default(), Notice::info("Waiting for input"));
        }

        let source_language = detect_language(&request.text);
        let translation = |text: String| TextTranslation {
            text,
            source_language: source_language.clone(),
        };

        match self.backend.translate_text(request, session.ticket()).await {
            Ok(Some(text)) => Reply::new(translation(text)),
            Ok(None) => Reply::with(
                translation(NO_RESPONSE.to_string()),
                Notice::error("The translation backend returned no result"),
            ),
            Err(e) => {
                log::warn!("Text translation for {} failed: {}", session.username(), e);
                Reply::with(translation(NO_RESPONSE.to_string()), Notice::error(e.to_string()))
            }
        }
    }

    /// Classifies, normalizes and submits an upload, then records the attempt.
    pub async fn submit_file(
        &self,
        session: &Session,
        upload: &Upload<'_>,
        options: &SubmitOptions,
    ) -> Reply<Option<SubmitReceipt>> {
        if options.project.is_empty() {
            return Reply::with(None, Notice::warning("Select a project first"));
        }

        let kind = classify(upload.file_name);
        if kind == DocumentKind::Unknown {
            return Reply::with(
                None,
                Notice::error(format!("Unsupported file type: {}", upload.file_name)),
            );
        }

        let source_text = match self.normalizer.normalize(upload.bytes, kind) {
            Ok(text) => text,
            Err(e) => {
                let e = e.with_filename(upload.file_name);
                log::warn!("Rejected upload from {}: {}", session.username(), e);
                return Reply::with(None, Notice::error(e.to_string()));
            }
        };

        let key = match self.free_key(&options.project, session.username()) {
            Ok(key) => key,
            Err(e) => {
                log::error!("Record store unavailable for {}: {}", session.username(), e);
                return Reply::with(None, Notice::error(format!("Could not save record: {}", e)));
            }
        };

        let params = TranslationParams {
            project: options.project.clone(),
            translate_type: options.translate_type.clone(),
            term: options.terms.clone(),
        };
        let submission = Submission {
            kind,
            file_name: upload.file_name,
            plain_text: &source_text,
            raw_bytes: upload.bytes,
            params: &params,
        };
        let outcome = self.submission.submit(&submission, session.ticket()).await;

        let (status, notice) = match &outcome {
            SubmitOutcome::Accepted { .. } => (JobStatus::Pending, Notice::success("Task added")),
            SubmitOutcome::NoJobId { reason } => (
                JobStatus::Unknown,
                Notice::warning(format!(
                    "Submitted, but the backend returned no job id ({}); progress cannot be tracked",
                    reason
                )),
            ),
        };

        let record = JobRecord {
            submitted_at: key.submitted_at,
            file_name: upload.file_name.to_string(),
            document_kind: kind,
            source_text,
            remote_job_id: outcome.job_id().map(str::to_string),
            status,
            params,
        };

        if let Err(e) = self.records.save(&key, &record) {
            log::error!("Failed to persist record {}: {}", key, e);
            return Reply::with(None, Notice::error(format!("Could not save record: {}", e)));
        }

        Reply::with(
            Some(SubmitReceipt {
                key,
                status,
                job_id: record.remote_job_id,
            }),
            notice,
        )
    }

    /// Submission key for now, moved forward past any record already stored in the same second.
    fn free_key(&self, project: &str, user: &str) -> Result<RecordKey, crate::store::StoreError> {
        let mut key = RecordKey::new(project, user, SubmittedAt::now());
        while self.records.exists(&key)? {
            key.submitted_at = key.submitted_at.next_second();
        }
        Ok(key)
    }

    /// The user's records in a project, newest first.
    pub fn records(&self, session: &Session, project: &str) -> Reply<Vec<RecordSummary>> {
        match self.records.list(project, session.username()) {
            Ok(records) if records.is_empty() => Reply::with(Vec::new(), Notice::info("No records")),
            Ok(records) => Reply::new(
                records
                    .into_iter()
                    .map(|r| RecordSummary {
                        submitted_at: r.submitted_at.to_string(),
                        file_name: r.file_name,
                        status: r.status,
                    })
                    .collect(),
            ),
            Err(e) => Reply::with(Vec::new(), Notice::error(format!("Could not load records: {}", e))),
        }
    }

    /// Reconciles one record. On failure nothing is written and the status
    /// reads as UNKNOWN unless the stored one is already terminal.
    pub async fn refresh(&self, session: &Session, key: &RecordKey) -> Reply<StatusView> {
        self.refresh_record(session, key).await.0
    }

    async fn refresh_record(
        &self,
        session: &Session,
        key: &RecordKey,
    ) -> (Reply<StatusView>, Option<JobRecord>) {
        let mut view = StatusView {
            key: key.clone(),
            status: None,
            progress: None,
        };

        if key.user != session.username() {
            return (
                Reply::with(view, Notice::error("This record belongs to another user")),
                None,
            );
        }

        match self.reconciler.reconcile(key).await {
            Ok(Reconciliation::NoRecord) => (Reply::with(view, Notice::warning("No such record")), None),
            Ok(Reconciliation::Updated { record, derivation }) => {
                view.status = Some(record.status);
                view.progress = derivation.progress;
                let notice = match record.status {
                    JobStatus::Success => Notice::success("Translated"),
                    JobStatus::Failure => Notice::error("Translation failed"),
                    JobStatus::Progress => match derivation.progress {
                        Some(p) => Notice::info(format!(
                            "Translating: {}/{} ({:.0}%)",
                            p.current, p.total, p.percent
                        )),
                        None => Notice::info("Translating"),
                    },
                    JobStatus::Pending | JobStatus::Unknown => match derivation.message {
                        Some(message) => {
                            if record.status == JobStatus::Unknown {
                                Notice::warning(message)
                            } else {
                                Notice::info(message)
                            }
                        }
                        None => Notice::info(record.status.to_string()),
                    },
                };
                (Reply::with(view, notice), Some(record))
            }
            Err(e) => {
                log::warn!("Could not reconcile {}: {}", key, e);
                let stored = match self.records.load(key) {
                    Ok(record) => record.filter(|r| r.status.is_terminal()),
                    Err(load_error) => {
                        log::warn!("Could not read {} after failed refresh: {}", key, load_error);
                        None
                    }
                };
                view.status = Some(stored.as_ref().map_or(JobStatus::Unknown, |r| r.status));
                (
                    Reply::with(
                        view,
                        Notice::warning(format!("Status could not be refreshed: {}", e)),
                    ),
                    stored,
                )
            }
        }
    }

    /// Refreshes the record and, once translated, fetches the artifact and
    /// diffs its text against the submitted source text.
    pub async fn open_result(&self, session: &Session, key: &RecordKey) -> Reply<Option<ResultView>> {
        let (refreshed, record) = self.refresh_record(session, key).await;
        let mut reply = Reply::with_notices(None, refreshed.notices);

        let Some(record) = record.filter(|r| r.status == JobStatus::Success) else {
            return reply.notice(Notice::info("The translation is not available yet"));
        };

        let location = ArtifactQuery::for_file(&self.artifact_config, &record.file_name).location();
        let bytes = match self.artifacts.download(&location).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Download of {} failed: {}", location.path, e);
                return reply.notice(Notice::error(format!("Download failed: {}", e)));
            }
        };

        let translated = match self.normalizer.normalize(&bytes, record.document_kind) {
            Ok(text) => Some(text),
            Err(e) => {
                reply.notices.push(Notice::warning(format!(
                    "Translated file could not be read for comparison: {}",
                    e.with_filename(&record.file_name)
                )));
                None
            }
        };

        let mime_type = mime_guess::from_path(&record.file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        reply.value = Some(ResultView {
            file_name: record.file_name.clone(),
            mime_type,
            diff: diff(&record.source_text, translated.as_deref()),
            bytes,
        });
        reply
    }
}
