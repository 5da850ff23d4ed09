use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::FileEncoding;
use crate::normalizer::DocumentKind;
use crate::record::TranslationParams;

/// A document handed to the backend for asynchronous translation.
#[derive(Debug, Clone, Copy)]
pub struct FileTranslationRequest<'a> {
    pub file_name: &'a str,
    pub kind: DocumentKind,
    pub bytes: &'a [u8],
    pub params: &'a TranslationParams,
}

impl FileTranslationRequest<'_> {
    /// JSON body of the submission call, with the file encoded as configured.
    pub fn to_body(&self, encoding: FileEncoding) -> Value {
        serde_json::json!({
            "term": self.params.term,
            "project": self.params.project,
            "extract_type": self.kind,
            "file_name": self.file_name,
            "file": encode_file(self.bytes, encoding),
            "translate_type": self.params.translate_type,
        })
    }
}

/// Synchronous text translation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextTranslationRequest {
    pub text: String,
    pub translate_type: String,
    #[serde(default)]
    pub term: Vec<String>,
    pub project: String,
}

/// Reply to a submission. Only the job id matters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitResponse {
    pub task_id: Option<String>,
}

impl SubmitResponse {
    pub fn from_json(value: &Value) -> Self {
        let task_id = match value.get("task_id") {
            Some(Value::String(id)) => Some(id.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Self {
            task_id: task_id.filter(|id| !id.is_empty()),
        }
    }
}

/// Job state as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RemoteStatus {
    #[default]
    Pending,
    Progress,
    Success,
    Failure,
    /// Any other value, kept verbatim for logging.
    Other(String),
}

impl RemoteStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" | "" => RemoteStatus::Pending,
            "PROGRESS" => RemoteStatus::Progress,
            "SUCCESS" => RemoteStatus::Success,
            "FAILURE" => RemoteStatus::Failure,
            _ => RemoteStatus::Other(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskStatusReport {
    pub status: RemoteStatus,
    pub progress: Option<Progress>,
}

impl TaskStatusReport {
    /// Reads `{status, result: {total, current, percent}}`. Missing or
    /// malformed fields fall back to PENDING without progress.
    pub fn from_json(value: &Value) -> Self {
        let status = value
            .get("status")
            .and_then(Value::as_str)
            .map(RemoteStatus::parse)
            .unwrap_or_default();

        let progress = value.get("result").and_then(|result| {
            let current = number(result.get("current")?)?;
            let total = number(result.get("total")?)?;
            let percent = result
                .get("percent")
                .and_then(number)
                .unwrap_or_else(|| if total > 0.0 { current / total * 100.0 } else { 0.0 });
            Some(Progress {
                current: current.max(0.0) as u64,
                total: total.max(0.0) as u64,
                percent,
            })
        });

        Self { status, progress }
    }
}

/// Accepts JSON numbers and numeric strings such as `"40"` or `"40%"`.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

/// Reads `data.result` of a text translation reply.
pub fn text_result(value: &Value) -> Option<String> {
    value
        .get("data")
        .and_then(|data| data.get("result"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Encodes raw file bytes for transport inside a JSON string.
pub fn encode_file(bytes: &[u8], encoding: FileEncoding) -> String {
    match encoding {
        FileEncoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        FileEncoding::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
    }
}
