//! Persisted translation jobs.
//!
//! A record lives in the `(project, user)` partition under its submission
//! timestamp. The stored JSON keeps the key names older deployments wrote
//! (`extract_type`, `pure_text`, `task_id`) so existing history stays readable.

use std::fmt;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::normalizer::DocumentKind;
use crate::store::{Namespace, RecordStore, StoreError};

/// Lifecycle of a translation job as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Progress,
    Success,
    Failure,
    /// Status could not be determined, or the record predates status tracking.
    #[default]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Progress => "PROGRESS",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failure => "FAILURE",
            JobStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Submission timestamp with second precision, in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubmittedAt(NaiveDateTime);

impl SubmittedAt {
    pub const FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    pub fn now() -> Self {
        Self::from_datetime(Local::now().naive_local())
    }

    /// Truncates to whole seconds so the value survives a round trip through its key.
    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        Self(datetime.with_nanosecond(0).unwrap_or(datetime))
    }

    pub fn parse(field: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(field, Self::FORMAT)
            .ok()
            .map(Self)
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    pub fn next_second(&self) -> Self {
        Self(self.0 + chrono::TimeDelta::seconds(1))
    }
}

impl fmt::Display for SubmittedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

/// Addresses one record: partition `(project, user)`, field `submitted_at`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub project: String,
    pub user: String,
    pub submitted_at: SubmittedAt,
}

impl RecordKey {
    pub fn new(project: impl Into<String>, user: impl Into<String>, submitted_at: SubmittedAt) -> Self {
        Self {
            project: project.into(),
            user: user.into(),
            submitted_at,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.project, self.user, self.submitted_at)
    }
}

/// Options chosen at submission time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationParams {
    #[serde(default)]
    pub project: String,
    /// Requested engine, e.g. `qcloud`.
    #[serde(default)]
    pub translate_type: String,
    /// Glossary names applied to the job.
    #[serde(default, deserialize_with = "deserialize_terms")]
    pub term: Vec<String>,
}

/// One submitted translation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub submitted_at: SubmittedAt,
    pub file_name: String,
    pub document_kind: DocumentKind,
    /// Normalized text of the upload at submission time.
    pub source_text: String,
    pub remote_job_id: Option<String>,
    pub status: JobStatus,
    pub params: TranslationParams,
}

impl JobRecord {
    pub fn key(&self, user: &str) -> RecordKey {
        RecordKey::new(&self.params.project, user, self.submitted_at)
    }
}

/// Stored JSON shape of a record.
#[derive(Debug, Serialize, Deserialize)]
struct StoredJob {
    #[serde(default)]
    file_name: String,
    #[serde(default = "unknown_kind")]
    extract_type: DocumentKind,
    #[serde(default)]
    pure_text: String,
    #[serde(
        default,
        serialize_with = "serialize_task_id",
        deserialize_with = "deserialize_task_id"
    )]
    task_id: Option<String>,
    #[serde(default)]
    status: JobStatus,
    #[serde(flatten)]
    params: TranslationParams,
}

fn unknown_kind() -> DocumentKind {
    DocumentKind::Unknown
}

fn serialize_task_id<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or(""))
}

fn deserialize_task_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|id| !id.trim().is_empty()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TermsOnDisk {
    List(Vec<String>),
    Single(String),
}

/// Accepts a list or a bare string; an empty string means no glossaries.
fn deserialize_terms<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<TermsOnDisk>::deserialize(deserializer)? {
        Some(TermsOnDisk::List(terms)) => terms,
        Some(TermsOnDisk::Single(term)) if !term.is_empty() => vec![term],
        _ => Vec::new(),
    })
}

impl JobRecord {
    fn to_stored(&self) -> StoredJob {
        StoredJob {
            file_name: self.file_name.clone(),
            extract_type: self.document_kind,
            pure_text: self.source_text.clone(),
            task_id: self.remote_job_id.clone(),
            status: self.status,
            params: self.params.clone(),
        }
    }

    fn from_stored(submitted_at: SubmittedAt, stored: StoredJob) -> Self {
        Self {
            submitted_at,
            file_name: stored.file_name,
            document_kind: stored.extract_type,
            source_text: stored.pure_text,
            remote_job_id: stored.task_id,
            status: stored.status,
            params: stored.params,
        }
    }
}

/// Typed access to job records in the record store.
#[derive(Clone)]
pub struct RecordRepository {
    store: Arc<dyn RecordStore>,
    namespace: Namespace,
}

impl RecordRepository {
    pub fn new(store: Arc<dyn RecordStore>, namespace: Namespace) -> Self {
        Self { store, namespace }
    }

    /// Writes the record under `key`, replacing any previous value.
    pub fn save(&self, key: &RecordKey, record: &JobRecord) -> Result<(), StoreError> {
        let partition = self.namespace.records(&key.project, &key.user);
        let field = key.submitted_at.to_string();
        let value = serde_json::to_string(&record.to_stored()).map_err(|e| StoreError::Corrupt {
            partition: partition.clone(),
            field: field.clone(),
            reason: e.to_string(),
        })?;
        self.store.hset(&partition, &field, &value)
    }

    pub fn exists(&self, key: &RecordKey) -> Result<bool, StoreError> {
        self.store.hexists(
            &self.namespace.records(&key.project, &key.user),
            &key.submitted_at.to_string(),
        )
    }

    pub fn load(&self, key: &RecordKey) -> Result<Option<JobRecord>, StoreError> {
        let partition = self.namespace.records(&key.project, &key.user);
        let field = key.submitted_at.to_string();
        let Some(raw) = self.store.hget(&partition, &field)? else {
            return Ok(None);
        };
        let stored: StoredJob = serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
            partition,
            field,
            reason: e.to_string(),
        })?;
        Ok(Some(JobRecord::from_stored(key.submitted_at, stored)))
    }

    /// Records of one user in one project, newest first. Entries whose key or
    /// value cannot be decoded are skipped.
    pub fn list(&self, project: &str, user: &str) -> Result<Vec<JobRecord>, StoreError> {
        let partition = self.namespace.records(project, user);
        let mut records: Vec<JobRecord> = self
            .store
            .hgetall(&partition)?
            .into_iter()
            .filter_map(|(field, raw)| {
                let Some(submitted_at) = SubmittedAt::parse(&field) else {
                    log::warn!("Skipping record with unparseable key '{}' in {}", field, partition);
                    return None;
                };
                match serde_json::from_str::<StoredJob>(&raw) {
                    Ok(stored) => Some(JobRecord::from_stored(submitted_at, stored)),
                    Err(e) => {
                        log::warn!("Skipping corrupt record '{}' in {}: {}", field, partition, e);
                        None
                    }
                }
            })
            .collect();

        records.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn at(s: &str) -> SubmittedAt {
        SubmittedAt::parse(s).unwrap()
    }

    fn sample(submitted_at: SubmittedAt) -> JobRecord {
        JobRecord {
            submitted_at,
            file_name: "report.xlsx".to_string(),
            document_kind: DocumentKind::Spreadsheet,
            source_text: "Sheet1a b\n c\n".to_string(),
            remote_job_id: Some("t-1".to_string()),
            status: JobStatus::Pending,
            params: TranslationParams {
                project: "game".to_string(),
                translate_type: "qcloud".to_string(),
                term: vec!["ui".to_string()],
            },
        }
    }

    fn repo() -> (Arc<MemoryStore>, RecordRepository) {
        let store = Arc::new(MemoryStore::new());
        let repo = RecordRepository::new(store.clone(), Namespace::new("desk", "dev"));
        (store, repo)
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_string(&JobStatus::Progress).unwrap(), "\"PROGRESS\"");
        let status: JobStatus = serde_json::from_str("\"FAILURE\"").unwrap();
        assert_eq!(status, JobStatus::Failure);
        assert!(JobStatus::Success.is_terminal());
        assert!(!JobStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_submitted_at_format() {
        let ts = at("2024-03-01 09:05:07");
        assert_eq!(ts.to_string(), "2024-03-01 09:05:07");
        assert!(SubmittedAt::parse("yesterday").is_none());
        let now = SubmittedAt::now();
        assert_eq!(SubmittedAt::parse(&now.to_string()), Some(now));
    }

    #[test]
    fn test_save_uses_legacy_keys() {
        let (store, repo) = repo();
        let record = sample(at("2024-03-01 09:05:07"));
        let key = record.key("alice");
        repo.save(&key, &record).unwrap();

        let raw = store
            .hget("desk:dev:record:game:alice", "2024-03-01 09:05:07")
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["extract_type"], "xlsx");
        assert_eq!(value["pure_text"], "Sheet1a b\n c\n");
        assert_eq!(value["task_id"], "t-1");
        assert_eq!(value["status"], "PENDING");
        assert_eq!(value["translate_type"], "qcloud");
        assert_eq!(value["term"][0], "ui");
        assert!(value.get("submitted_at").is_none());

        assert_eq!(repo.load(&key).unwrap(), Some(record));
    }

    #[test]
    fn test_reads_records_written_before_status_tracking() {
        let (store, repo) = repo();
        let legacy = r#"{"term": "", "project": "game", "extract_type": "docx",
            "file_name": "notes.docx", "file": "PK...", "translate_type": "chatgpt",
            "pure_text": "hello", "task_id": ""}"#;
        store
            .hset("desk:dev:record:game:bob", "2023-01-02 03:04:05", legacy)
            .unwrap();

        let key = RecordKey::new("game", "bob", at("2023-01-02 03:04:05"));
        let record = repo.load(&key).unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Unknown);
        assert_eq!(record.remote_job_id, None);
        assert_eq!(record.document_kind, DocumentKind::WordDocument);
        assert!(record.params.term.is_empty());
        assert_eq!(record.source_text, "hello");
    }

    #[test]
    fn test_unknown_extract_type_reads_as_unknown() {
        let (store, repo) = repo();
        store
            .hset("desk:dev:record:game:bob", "2023-01-02 03:04:05", r#"{"extract_type": ""}"#)
            .unwrap();
        let key = RecordKey::new("game", "bob", at("2023-01-02 03:04:05"));
        let record = repo.load(&key).unwrap().unwrap();
        assert_eq!(record.document_kind, DocumentKind::Unknown);
    }

    #[test]
    fn test_missing_record_is_none() {
        let (_, repo) = repo();
        let key = RecordKey::new("game", "nobody", at("2023-01-02 03:04:05"));
        assert!(repo.load(&key).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_value_is_an_error_on_load() {
        let (store, repo) = repo();
        store
            .hset("desk:dev:record:game:bob", "2023-01-02 03:04:05", "not json")
            .unwrap();
        let key = RecordKey::new("game", "bob", at("2023-01-02 03:04:05"));
        assert!(matches!(repo.load(&key), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_list_is_newest_first_and_skips_garbage() {
        let (store, repo) = repo();
        for ts in ["2024-01-01 00:00:00", "2024-06-01 00:00:00", "2024-03-01 00:00:00"] {
            let record = sample(at(ts));
            repo.save(&record.key("alice"), &record).unwrap();
        }
        store.hset("desk:dev:record:game:alice", "garbage", "{}").unwrap();
        store
            .hset("desk:dev:record:game:alice", "2024-02-01 00:00:00", "not json")
            .unwrap();

        let listed: Vec<String> = repo
            .list("game", "alice")
            .unwrap()
            .iter()
            .map(|r| r.submitted_at.to_string())
            .collect();
        assert_eq!(
            listed,
            vec!["2024-06-01 00:00:00", "2024-03-01 00:00:00", "2024-01-01 00:00:00"]
        );
    }
}
