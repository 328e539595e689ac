//! Session acquisition.
//!
//! Accounts live in the same key-value store as the dashboard. There is no
//! hashing or rate limiting here; a successful login only tells the host it
//! may open the dashboard.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::EngineError;
use crate::store::{load_json, save_json, KeyValueStore};
use crate::EngineResult;

/// Built-in account that always signs in.
pub const DEMO_EMAIL: &str = "creator@gostream.com";

/// Password of the built-in account.
pub const DEMO_PASSWORD: &str = "password123";

const DEMO_NAME: &str = "Creator";

/// Registration form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name.
    pub name: String,

    /// Login email.
    pub email: String,

    /// Password.
    pub password: String,
}

/// An acquired session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Display name.
    pub name: String,

    /// Login email.
    pub email: String,
}

/// Login and registration against a [`KeyValueStore`].
#[derive(Clone)]
pub struct Accounts {
    store: Arc<dyn KeyValueStore>,
}

impl Accounts {
    /// Create an account book on `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(email: &str) -> String {
        format!("user_{}", email.trim().to_ascii_lowercase())
    }

    fn is_demo(email: &str) -> bool {
        email.trim().eq_ignore_ascii_case(DEMO_EMAIL)
    }

    /// Check credentials.
    #[instrument(name = "login", skip(self, password))]
    pub fn login(&self, email: &str, password: &str) -> EngineResult<Session> {
        if Self::is_demo(email) && password == DEMO_PASSWORD {
            info!("Demo account signed in");
            return Ok(Session {
                name: DEMO_NAME.to_string(),
                email: DEMO_EMAIL.to_string(),
            });
        }

        let profile: Profile = load_json(self.store.as_ref(), &Self::key(email))?
            .ok_or(EngineError::InvalidCredentials)?;
        if profile.password != password {
            return Err(EngineError::InvalidCredentials);
        }

        info!("Signed in");
        Ok(Session {
            name: profile.name,
            email: profile.email,
        })
    }

    /// Create an account and sign it in.
    #[instrument(name = "register", skip(self, profile), fields(email = %profile.email))]
    pub fn register(&self, profile: Profile) -> EngineResult<Session> {
        let key = Self::key(&profile.email);
        let taken = Self::is_demo(&profile.email)
            || self.store.get(&key)?.is_some();
        if taken {
            return Err(EngineError::AlreadyExists(profile.email));
        }

        save_json(self.store.as_ref(), &key, &profile)?;
        info!("Account registered");
        Ok(Session {
            name: profile.name,
            email: profile.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileStore, MemoryStore};

    fn accounts() -> Accounts {
        Accounts::new(Arc::new(MemoryStore::new()))
    }

    fn profile() -> Profile {
        Profile {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[test]
    fn test_demo_account_logs_in() {
        let session = accounts().login(DEMO_EMAIL, DEMO_PASSWORD).unwrap();
        assert_eq!(session.email, DEMO_EMAIL);
    }

    #[test]
    fn test_demo_email_ignores_case() {
        let accounts = accounts();

        let session = accounts.login("Creator@GoStream.com", DEMO_PASSWORD).unwrap();
        assert_eq!(session.email, DEMO_EMAIL);

        let mut taken = profile();
        taken.email = "CREATOR@gostream.com".to_string();
        assert!(matches!(
            accounts.register(taken),
            Err(EngineError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_lookalike_emails_are_separate_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let accounts = Accounts::new(Arc::new(FileStore::open(dir.path()).unwrap()));

        let mut slash = profile();
        slash.name = "Slash".to_string();
        slash.email = "a/b@x.com".to_string();
        accounts.register(slash).unwrap();

        let mut underscore = profile();
        underscore.name = "Underscore".to_string();
        underscore.email = "a_b@x.com".to_string();
        accounts.register(underscore).unwrap();

        let session = accounts.login("a_b@x.com", "hunter2").unwrap();
        assert_eq!(session.name, "Underscore");
        assert_eq!(accounts.login("a/b@x.com", "hunter2").unwrap().name, "Slash");
    }

    #[test]
    fn test_unknown_user_is_invalid() {
        assert!(matches!(
            accounts().login("nobody@example.com", "x"),
            Err(EngineError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_register_then_login() {
        let accounts = accounts();
        accounts.register(profile()).unwrap();

        let session = accounts.login("ada@example.com", "hunter2").unwrap();
        assert_eq!(session.name, "Ada");
        assert!(matches!(
            accounts.login("ada@example.com", "wrong"),
            Err(EngineError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_register_twice_already_exists() {
        let accounts = accounts();
        accounts.register(profile()).unwrap();

        let mut again = profile();
        again.email = "ADA@example.com".to_string();
        assert!(matches!(
            accounts.register(again),
            Err(EngineError::AlreadyExists(_))
        ));
    }
}
