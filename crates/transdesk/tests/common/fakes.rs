//! Scripted stand-ins for the remote services.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use secrecy::SecretString;

use transdesk::artifact::{ArtifactLocation, ArtifactNode, ArtifactQuery, ArtifactSearch, ArtifactStore};
use transdesk::backend::{
    FileTranslationRequest, Progress, RemoteStatus, SubmitResponse, TaskStatusReport,
    TextTranslationRequest, TranslationBackend,
};
use transdesk::error::{ArtifactError, ReconcileError, SubmitError};
use transdesk::store::{RecordStore, StoreError};

/// What the fake backend answers to a submission.
#[derive(Debug, Clone)]
pub enum SubmitReply {
    JobId(String),
    NoJobId,
    Status(u16),
}

/// Backend fake with per-job status scripts and call counters.
pub struct FakeBackend {
    submit_reply: Mutex<SubmitReply>,
    statuses: Mutex<HashMap<String, TaskStatusReport>>,
    text_reply: Mutex<Option<String>>,
    pub submitted: Mutex<Vec<String>>,
    pub status_calls: Mutex<Vec<String>>,
    pub text_calls: Mutex<usize>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            submit_reply: Mutex::new(SubmitReply::JobId("job-1".to_string())),
            statuses: Mutex::new(HashMap::new()),
            text_reply: Mutex::new(None),
            submitted: Mutex::new(Vec::new()),
            status_calls: Mutex::new(Vec::new()),
            text_calls: Mutex::new(0),
        }
    }

    pub fn reply_to_submit(&self, reply: SubmitReply) {
        *self.submit_reply.lock().unwrap() = reply;
    }

    pub fn set_status(&self, job_id: &str, status: RemoteStatus) {
        self.statuses.lock().unwrap().insert(
            job_id.to_string(),
            TaskStatusReport {
                status,
                progress: None,
            },
        );
    }

    pub fn set_progress(&self, job_id: &str, current: u64, total: u64) {
        self.statuses.lock().unwrap().insert(
            job_id.to_string(),
            TaskStatusReport {
                status: RemoteStatus::Progress,
                progress: Some(Progress {
                    current,
                    total,
                    percent: current as f64 / total as f64 * 100.0,
                }),
            },
        );
    }

    pub fn reply_to_text(&self, text: Option<&str>) {
        *self.text_reply.lock().unwrap() = text.map(str::to_string);
    }

    pub fn status_call_count(&self) -> usize {
        self.status_calls.lock().unwrap().len()
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranslationBackend for FakeBackend {
    async fn submit_file(
        &self,
        request: &FileTranslationRequest<'_>,
        _ticket: &SecretString,
    ) -> Result<SubmitResponse, SubmitError> {
        self.submitted
            .lock()
            .unwrap()
            .push(request.file_name.to_string());
        match self.submit_reply.lock().unwrap().clone() {
            SubmitReply::JobId(id) => Ok(SubmitResponse { task_id: Some(id) }),
            SubmitReply::NoJobId => Ok(SubmitResponse { task_id: None }),
            SubmitReply::Status(status) => Err(SubmitError::Status {
                status,
                body: "backend down".to_string(),
            }),
        }
    }

    async fn job_status(&self, task_id: &str) -> Result<TaskStatusReport, ReconcileError> {
        self.status_calls.lock().unwrap().push(task_id.to_string());
        self.statuses
            .lock()
            .unwrap()
            .get(task_id)
            .cloned()
            .ok_or_else(|| ReconcileError::Backend(format!("unknown task {}", task_id)))
    }

    async fn translate_text(
        &self,
        _request: &TextTranslationRequest,
        _ticket: &SecretString,
    ) -> Result<Option<String>, SubmitError> {
        *self.text_calls.lock().unwrap() += 1;
        Ok(self.text_reply.lock().unwrap().clone())
    }
}

/// Artifact store fake holding published files by name.
pub struct FakeArtifactStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
    unreachable: Mutex<bool>,
    pub downloads: Mutex<Vec<String>>,
}

impl FakeArtifactStore {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            unreachable: Mutex::new(false),
            downloads: Mutex::new(Vec::new()),
        }
    }

    pub fn publish(&self, file_name: &str, bytes: Vec<u8>) {
        self.files
            .lock()
            .unwrap()
            .insert(file_name.to_string(), bytes);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock().unwrap() = unreachable;
    }

    fn check_reachable(&self) -> Result<(), ArtifactError> {
        if *self.unreachable.lock().unwrap() {
            Err(ArtifactError::Status { status: 503 })
        } else {
            Ok(())
        }
    }
}

impl Default for FakeArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactStore for FakeArtifactStore {
    async fn search(&self, query: &ArtifactQuery) -> Result<ArtifactSearch, ArtifactError> {
        self.check_reachable()?;
        let files = self.files.lock().unwrap();
        Ok(match files.get(&query.file_name) {
            Some(bytes) => ArtifactSearch {
                count: 1,
                records: vec![ArtifactNode {
                    name: query.file_name.clone(),
                    full_path: format!("{}{}", query.path, query.file_name),
                    size: bytes.len() as u64,
                    last_modified_date: None,
                }],
            },
            None => ArtifactSearch::default(),
        })
    }

    async fn download(&self, location: &ArtifactLocation) -> Result<Vec<u8>, ArtifactError> {
        self.check_reachable()?;
        self.downloads.lock().unwrap().push(location.path.clone());
        let name = location.path.rsplit('/').next().unwrap_or_default();
        self.files
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or(ArtifactError::Status { status: 404 })
    }
}

/// Record store whose every call fails.
pub struct BrokenStore;

impl RecordStore for BrokenStore {
    fn hset(&self, _partition: &str, _field: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::LockPoisoned)
    }

    fn hget(&self, _partition: &str, _field: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::LockPoisoned)
    }

    fn hgetall(&self, _partition: &str) -> Result<Vec<(String, String)>, StoreError> {
        Err(StoreError::LockPoisoned)
    }
}
