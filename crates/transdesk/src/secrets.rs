//! Credential lookup for the backend token and the artifact-store password.
//!
//! Sources are tried in order: an inline value, then a file (the Docker
//! secrets layout, `~` expanded), then a named environment variable.

use secrecy::SecretString;
use std::fs;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No credential source configured (expected a value, a file, or an env var)")]
    NoSourceProvided,

    #[error("Failed to read credential file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a credential from the first non-empty source. File and env
/// contents are trimmed.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = direct.filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let expanded = expand_home(path);
        return fs::read_to_string(&expanded)
            .map(|content| SecretString::from(content.trim().to_string()))
            .map_err(|source| SecretError::FileReadError {
                path: expanded,
                source,
            });
    }

    if let Some(name) = env_var.filter(|n| !n.is_empty()) {
        return match std::env::var(name) {
            Ok(value) => Ok(SecretString::from(value.trim())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

/// Like [`resolve_secret`], but an absent source yields `None`.
pub fn resolve_secret_optional(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<Option<SecretString>> {
    match resolve_secret(direct, file_path, env_var) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn has_secret_source(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> bool {
    [direct, file_path, env_var]
        .into_iter()
        .any(|s| s.is_some_and(|s| !s.is_empty()))
}

/// Expands a leading `~` or `~/`. `~user/` forms are left untouched.
pub(crate) fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy();
            return if path == "~" {
                home.into_owned()
            } else {
                path.replacen('~', &home, 1)
            };
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_direct_value_wins() {
        std::env::set_var("TRANSDESK_TEST_SECRET_A", "from-env");
        let secret = resolve_secret(
            Some("inline"),
            Some("/nonexistent"),
            Some("TRANSDESK_TEST_SECRET_A"),
        )
        .unwrap();
        std::env::remove_var("TRANSDESK_TEST_SECRET_A");
        assert_eq!(secret.expose_secret(), "inline");
    }

    #[test]
    #[serial]
    fn test_file_before_env() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  from-file  ").unwrap();
        std::env::set_var("TRANSDESK_TEST_SECRET_B", "from-env");

        let secret = resolve_secret(
            None,
            file.path().to_str(),
            Some("TRANSDESK_TEST_SECRET_B"),
        )
        .unwrap();
        std::env::remove_var("TRANSDESK_TEST_SECRET_B");
        assert_eq!(secret.expose_secret(), "from-file");
    }

    #[test]
    #[serial]
    fn test_env_fallback_and_empty_strings() {
        std::env::set_var("TRANSDESK_TEST_SECRET_C", "token\n");
        let secret = resolve_secret(Some(""), Some(""), Some("TRANSDESK_TEST_SECRET_C")).unwrap();
        std::env::remove_var("TRANSDESK_TEST_SECRET_C");
        assert_eq!(secret.expose_secret(), "token");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            resolve_secret(None, None, None),
            Err(SecretError::NoSourceProvided)
        ));
        assert!(matches!(
            resolve_secret(None, Some("/nonexistent/secret"), None),
            Err(SecretError::FileReadError { .. })
        ));
        assert!(matches!(
            resolve_secret(None, None, Some("TRANSDESK_TEST_SECRET_NEVER_SET")),
            Err(SecretError::EnvVarNotSet { .. })
        ));
    }

    #[test]
    fn test_optional_and_has_source() {
        assert!(resolve_secret_optional(None, Some(""), None).unwrap().is_none());
        assert!(resolve_secret_optional(None, None, Some("TRANSDESK_TEST_SECRET_NEVER_SET")).is_err());
        assert!(has_secret_source(None, None, Some("X")));
        assert!(!has_secret_source(Some(""), None, None));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/etc/token"), "/etc/token");
        assert_eq!(expand_home("~alice/token"), "~alice/token");
        if let Some(home) = dirs::home_dir() {
            let expanded = expand_home("~/token");
            assert_eq!(expanded, format!("{}/token", home.to_string_lossy()));
        }
    }
}
