//! Desk wired to fakes over an in-memory record store.

#![allow(dead_code)]

use std::sync::Arc;

use secrecy::SecretString;

use transdesk::config::{load_config_from_str, Config};
use transdesk::record::{JobRecord, JobStatus, RecordKey, RecordRepository, SubmittedAt, TranslationParams};
use transdesk::store::{MemoryStore, Namespace, RecordStore};
use transdesk::{Desk, DocumentKind, Session};

use super::fakes::{FakeArtifactStore, FakeBackend};

pub const USER: &str = "alice";
pub const PROJECT: &str = "game";

pub fn test_config() -> Config {
    load_config_from_str(
        r#"{
            "deployment": { "appCode": "desk", "environment": "test" },
            "backend": { "rootUrl": "http://backend.local" },
            "artifacts": { "rootUrl": "http://repo.local" },
            "store": { "kind": "memory" },
            "ui": { "members": ["bob", "carol"] }
        }"#,
    )
    .unwrap()
}

pub struct TestDesk {
    pub desk: Desk,
    pub store: Arc<dyn RecordStore>,
    pub backend: Arc<FakeBackend>,
    pub artifacts: Arc<FakeArtifactStore>,
    pub records: RecordRepository,
    pub session: Session,
}

impl TestDesk {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn RecordStore>) -> Self {
        let config = test_config();
        let backend = Arc::new(FakeBackend::new());
        let artifacts = Arc::new(FakeArtifactStore::new());
        let desk = Desk::new(&config, store.clone(), backend.clone(), artifacts.clone());
        let records = RecordRepository::new(store.clone(), Namespace::from_config(&config.deployment));

        Self {
            desk,
            store,
            backend,
            artifacts,
            records,
            session: session(USER),
        }
    }

    /// Stores a record directly, bypassing submission.
    pub fn seed(
        &self,
        submitted_at: &str,
        file_name: &str,
        source_text: &str,
        job_id: Option<&str>,
        status: JobStatus,
    ) -> RecordKey {
        let submitted_at = SubmittedAt::parse(submitted_at).unwrap();
        let key = RecordKey::new(PROJECT, USER, submitted_at);
        let record = JobRecord {
            submitted_at,
            file_name: file_name.to_string(),
            document_kind: transdesk::classify(file_name),
            source_text: source_text.to_string(),
            remote_job_id: job_id.map(str::to_string),
            status,
            params: TranslationParams {
                project: PROJECT.to_string(),
                translate_type: "korea".to_string(),
                term: Vec::new(),
            },
        };
        self.records.save(&key, &record).unwrap();
        key
    }

    pub fn stored(&self, key: &RecordKey) -> Option<JobRecord> {
        self.records.load(key).unwrap()
    }
}

impl Default for TestDesk {
    fn default() -> Self {
        Self::new()
    }
}

pub fn session(user: &str) -> Session {
    Session::authenticate(Some(user), SecretString::from("ticket"), "http://login").unwrap()
}

pub fn kind_of(file_name: &str) -> DocumentKind {
    transdesk::classify(file_name)
}
