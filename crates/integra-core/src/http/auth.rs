//! Basic authentication credentials
//!
//! Credentials are passed explicitly, or read from `INTEGRA_LOGIN` and
//! `INTEGRA_PASSWORD`.

use crate::{Error, Result};
use std::fmt;

/// Environment variable holding the API login
pub const LOGIN_ENV: &str = "INTEGRA_LOGIN";
/// Environment variable holding the API password
pub const PASSWORD_ENV: &str = "INTEGRA_PASSWORD";

/// Login and password sent with every request as HTTP basic auth
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    /// Create with explicit values
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::resolve(None, None)
    }

    /// Explicit values win; missing ones fall back to the environment
    pub fn resolve(login: Option<String>, password: Option<String>) -> Result<Self> {
        let login = match login {
            Some(login) => login,
            None => env_var(LOGIN_ENV, "Login")?,
        };
        let password = match password {
            Some(password) => password,
            None => env_var(PASSWORD_ENV, "Password")?,
        };
        Ok(Self { login, password })
    }

    /// True when no login was configured
    pub fn is_anonymous(&self) -> bool {
        self.login.is_empty()
    }
}

fn env_var(name: &str, what: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::config(format!("{} not found. Set {} environment variable", what, name)))
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_password() {
        let creds = Credentials::new("jdoe", "s3cret");
        let shown = format!("{:?}", creds);
        assert!(shown.contains("jdoe"));
        assert!(!shown.contains("s3cret"));
    }

    #[test]
    fn test_explicit_values_win() {
        let creds = Credentials::resolve(Some("a".into()), Some("b".into())).unwrap();
        assert_eq!(creds, Credentials::new("a", "b"));
        assert!(!creds.is_anonymous());
        assert!(Credentials::default().is_anonymous());
    }
}
