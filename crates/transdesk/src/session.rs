use secrecy::SecretString;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Login required: {login_url}")]
    LoginRequired { login_url: String },
}

/// Authenticated user context for one sequence of desk actions.
#[derive(Debug, Clone)]
pub struct Session {
    username: String,
    ticket: SecretString,
}

impl Session {
    /// Accepts the identity supplied by the login gateway. An empty user name
    /// means the gateway did not authenticate the request.
    pub fn authenticate(
        username: Option<&str>,
        ticket: SecretString,
        login_url: &str,
    ) -> Result<Self, AuthError> {
        match username.map(str::trim).filter(|u| !u.is_empty()) {
            Some(username) => Ok(Self {
                username: username.to_string(),
                ticket,
            }),
            None => {
                log::warn!("Rejected request without an authenticated user");
                Err(AuthError::LoginRequired {
                    login_url: login_url.to_string(),
                })
            }
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn ticket(&self) -> &SecretString {
        &self.ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_authenticated_session() {
        let session =
            Session::authenticate(Some(" alice "), SecretString::from("tkt"), "http://login").unwrap();
        assert_eq!(session.username(), "alice");
        assert_eq!(session.ticket().expose_secret(), "tkt");
    }

    #[test]
    fn test_missing_user_requires_login() {
        for username in [None, Some(""), Some("   ")] {
            let result = Session::authenticate(username, SecretString::from(""), "http://login");
            assert_eq!(
                result.unwrap_err(),
                AuthError::LoginRequired {
                    login_url: "http://login".to_string()
                }
            );
        }
    }

    #[test]
    fn test_debug_does_not_leak_ticket() {
        let session =
            Session::authenticate(Some("alice"), SecretString::from("s3cret-ticket"), "").unwrap();
        assert!(!format!("{:?}", session).contains("s3cret-ticket"));
    }
}
