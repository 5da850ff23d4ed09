use std::path::Path;

use crate::config::schema::{CellJoin, Config, FileEncoding, StoreKind};
use crate::error::ConfigError;

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "TRANSDESK_";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = load_config_from_str(&content)?;
    log::info!("Loaded configuration from {}", path.display());
    Ok(config)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

impl Config {
    /// Overlays `TRANSDESK_*` environment variables and re-validates.
    pub fn apply_env_overrides(mut self) -> Result<Self, ConfigError> {
        self.apply_overrides(|name| std::env::var(format!("{}{}", ENV_PREFIX, name)).ok())?;
        validate_config(&self)?;
        Ok(self)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("APP_CODE") {
            self.deployment.app_code = v;
        }
        if let Some(v) = lookup("ENVIRONMENT") {
            self.deployment.environment = v;
        }
        if let Some(v) = lookup("BACKEND_URL") {
            self.backend.root_url = v;
        }
        if let Some(v) = lookup("BACKEND_TOKEN") {
            self.backend.token.value = Some(v);
        }
        if let Some(v) = lookup("FILE_ENCODING") {
            self.backend.file_encoding = parse_enum::<FileEncoding>("FILE_ENCODING", &v)?;
        }
        if let Some(v) = lookup("ARTIFACT_URL") {
            self.artifacts.root_url = v;
        }
        if let Some(v) = lookup("ARTIFACT_USERNAME") {
            self.artifacts.username = v;
        }
        if let Some(v) = lookup("ARTIFACT_PASSWORD") {
            self.artifacts.password.value = Some(v);
        }
        if let Some(v) = lookup("STORE") {
            self.store.kind = parse_enum::<StoreKind>("STORE", &v)?;
        }
        if let Some(v) = lookup("STORE_PATH") {
            self.store.path = Some(v);
        }
        if let Some(v) = lookup("CELL_JOIN") {
            self.normalizer.cell_join = parse_enum::<CellJoin>("CELL_JOIN", &v)?;
        }
        if let Some(v) = lookup("LOGIN_URL") {
            self.ui.login_url = v;
        }
        if let Some(v) = lookup("LANGUAGES") {
            self.ui.languages = split_list(&v);
        }
        if let Some(v) = lookup("MODELS") {
            self.ui.models = split_list(&v);
        }
        if let Some(v) = lookup("MEMBERS") {
            self.ui.members = split_list(&v);
        }
        if let Some(v) = lookup("LOG") {
            self.logging.filter = v;
        }
        Ok(())
    }
}

fn parse_enum<T: serde::de::DeserializeOwned>(name: &str, value: &str) -> Result<T, ConfigError> {
    serde_json::from_value(serde_json::Value::String(value.to_ascii_lowercase())).map_err(|e| {
        ConfigError::InvalidEnv {
            name: format!("{}{}", ENV_PREFIX, name),
            reason: e.to_string(),
        }
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    validate_url("backend.rootUrl", &config.backend.root_url)?;
    validate_url("artifacts.rootUrl", &config.artifacts.root_url)?;

    for (field, value) in [
        ("deployment.appCode", &config.deployment.app_code),
        ("deployment.environment", &config.deployment.environment),
        ("backend.submitMethod", &config.backend.submit_method),
        ("backend.statusMethod", &config.backend.status_method),
        ("backend.textMethod", &config.backend.text_method),
        ("artifacts.project", &config.artifacts.project),
        ("artifacts.repo", &config.artifacts.repo),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: format!("{} must not be empty", field),
            });
        }
        if value.contains(':') && field.starts_with("deployment") {
            return Err(ConfigError::Validation {
                message: format!("{} must not contain ':'", field),
            });
        }
    }

    if !config.artifacts.target_path.starts_with('/') || !config.artifacts.target_path.ends_with('/')
    {
        return Err(ConfigError::Validation {
            message: format!(
                "artifacts.targetPath must start and end with '/': {}",
                config.artifacts.target_path
            ),
        });
    }

    if config.artifacts.page_size == 0 {
        return Err(ConfigError::Validation {
            message: "artifacts.pageSize must be positive".to_string(),
        });
    }

    if config.backend.request_timeout_secs == 0 || config.artifacts.request_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "request timeouts must be positive".to_string(),
        });
    }

    if config.store.kind == StoreKind::Sqlite {
        if let Some(path) = &config.store.path {
            if path.trim().is_empty() {
                return Err(ConfigError::Validation {
                    message: "store.path must not be empty when set".to_string(),
                });
            }
        }
    }

    Ok(())
}

fn validate_url(field: &str, url: &str) -> Result<(), ConfigError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Validation {
            message: format!("{} must be an http(s) URL, got '{}'", field, url),
        });
    }
    Ok(())
}
