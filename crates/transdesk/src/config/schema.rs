use serde::{Deserialize, Serialize};

use crate::secrets::{resolve_secret, resolve_secret_optional, SecretError};
use secrecy::SecretString;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub deployment: DeploymentConfig,
    pub backend: BackendConfig,
    pub artifacts: ArtifactConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Identifies this deployment; prefixes every record-store partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    #[serde(default = "default_app_code")]
    pub app_code: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_app_code() -> String {
    "transdesk".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            app_code: default_app_code(),
            environment: default_environment(),
        }
    }
}

/// A secret given directly, through a file, or through an environment variable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,
}

impl SecretRef {
    pub fn from_env_var(name: &str) -> Self {
        Self {
            env_var: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn resolve(&self) -> Result<SecretString, SecretError> {
        resolve_secret(
            self.value.as_deref(),
            self.file.as_deref(),
            self.env_var.as_deref(),
        )
    }

    pub fn resolve_optional(&self) -> Result<Option<SecretString>, SecretError> {
        resolve_secret_optional(
            self.value.as_deref(),
            self.file.as_deref(),
            self.env_var.as_deref(),
        )
    }
}

/// How raw file bytes travel inside the JSON submission body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileEncoding {
    /// Each byte becomes the character with the same code point.
    #[default]
    Latin1,
    Base64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    pub root_url: String,
    #[serde(default)]
    pub token: SecretRef,
    #[serde(default = "default_submit_method")]
    pub submit_method: String,
    #[serde(default = "default_status_method")]
    pub status_method: String,
    #[serde(default = "default_text_method")]
    pub text_method: String,
    #[serde(default)]
    pub file_encoding: FileEncoding,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_submit_method() -> String {
    "translate_file".to_string()
}

fn default_status_method() -> String {
    "task_status".to_string()
}

fn default_text_method() -> String {
    "translate".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactConfig {
    pub root_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: SecretRef,
    #[serde(default = "default_artifact_project")]
    pub project: String,
    #[serde(default = "default_artifact_repo")]
    pub repo: String,
    #[serde(default = "default_target_path")]
    pub target_path: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_artifact_project() -> String {
    "opsbot2".to_string()
}

fn default_artifact_repo() -> String {
    "translate".to_string()
}

fn default_target_path() -> String {
    "/target/".to_string()
}

fn default_page_size() -> u32 {
    1000
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,
    /// SQLite file; defaults to `~/.transdesk/data/records.db`.
    #[serde(default)]
    pub path: Option<String>,
}

/// Separator policy between adjacent non-empty spreadsheet cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellJoin {
    /// One space between adjacent non-empty cells.
    #[default]
    Spaced,
    /// No separator; matches text stored by earlier deployments byte for byte.
    Concatenated,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizerConfig {
    #[serde(default)]
    pub cell_join: CellJoin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub login_url: String,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    /// Users that may be added as project members.
    #[serde(default)]
    pub members: Vec<String>,
}

fn default_title() -> String {
    "transdesk".to_string()
}

fn default_languages() -> Vec<String> {
    vec!["korea".to_string()]
}

fn default_models() -> Vec<String> {
    vec!["qcloud".to_string(), "chatgpt".to_string()]
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            domain: String::new(),
            login_url: String::new(),
            languages: default_languages(),
            models: default_models(),
            members: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_filter() -> String {
    "transdesk=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            format: LogFormat::default(),
        }
    }
}
