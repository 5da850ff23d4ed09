use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use super::types::{
    text_result, FileTranslationRequest, SubmitResponse, TaskStatusReport, TextTranslationRequest,
};
use super::TranslationBackend;
use crate::config::{BackendConfig, FileEncoding};
use crate::error::{ReconcileError, SubmitError};

/// Error bodies are cut to this length before they reach logs or notices.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Header carrying the user's login ticket.
pub const TICKET_HEADER: &str = "bk_ticket";

pub(crate) fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_LENGTH) {
        Some((cut, _)) => format!("{}... (truncated)", &body[..cut]),
        None => body.to_string(),
    }
}

/// Translation backend reached over HTTP as `POST {root}/{method}/`.
pub struct HttpTranslationBackend {
    client: Client,
    root_url: String,
    token: Option<SecretString>,
    submit_method: String,
    status_method: String,
    text_method: String,
    file_encoding: FileEncoding,
}

impl HttpTranslationBackend {
    pub fn new(config: &BackendConfig) -> crate::error::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(SubmitError::Transport)?;

        Ok(Self {
            client,
            root_url: config.root_url.trim_end_matches('/').to_string(),
            token: config.token.resolve_optional()?,
            submit_method: config.submit_method.clone(),
            status_method: config.status_method.clone(),
            text_method: config.text_method.clone(),
            file_encoding: config.file_encoding,
        })
    }

    pub fn method_url(&self, method: &str) -> String {
        format!("{}/{}/", self.root_url, method.trim_matches('/'))
    }

    /// Posts `body` to `method`. A reply that is not JSON reads as `{}`.
    async fn call(
        &self,
        method: &str,
        ticket: Option<&SecretString>,
        body: &Value,
    ) -> Result<Value, SubmitError> {
        let url = self.method_url(method);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.header("token", token.expose_secret());
        }
        if let Some(ticket) = ticket {
            request = request.header(TICKET_HEADER, ticket.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(SubmitError::Status {
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        Ok(serde_json::from_str(&text).unwrap_or_else(|e| {
            log::debug!("Non-JSON reply from {}: {}", url, e);
            Value::Object(serde_json::Map::new())
        }))
    }
}

#[async_trait]
impl TranslationBackend for HttpTranslationBackend {
    async fn submit_file(
        &self,
        request: &FileTranslationRequest<'_>,
        ticket: &SecretString,
    ) -> Result<SubmitResponse, SubmitError> {
        let body = request.to_body(self.file_encoding);
        let reply = self.call(&self.submit_method, Some(ticket), &body).await?;
        Ok(SubmitResponse::from_json(&reply))
    }

    async fn job_status(&self, task_id: &str) -> Result<TaskStatusReport, ReconcileError> {
        let body = serde_json::json!({ "task_id": task_id });
        let reply = self
            .call(&self.status_method, None, &body)
            .await
            .map_err(|e| ReconcileError::Backend(e.to_string()))?;
        Ok(TaskStatusReport::from_json(&reply))
    }

    async fn translate_text(
        &self,
        request: &TextTranslationRequest,
        ticket: &SecretString,
    ) -> Result<Option<String>, SubmitError> {
        let body = serde_json::to_value(request).map_err(|e| SubmitError::Encode(e.to_string()))?;
        let reply = self.call(&self.text_method, Some(ticket), &body).await?;
        Ok(text_result(&reply))
    }
}
