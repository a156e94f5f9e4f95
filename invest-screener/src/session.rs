//! Authenticated session, optionally persisted to disk.
//!
//! The session is the [`AuthProvider`] handed to the API client. Only the
//! user and access token are written out; a 401 on an authenticated request
//! ends the session and deletes the file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

use invest_common::error::ResultExt;
use invest_common::{Result, SessionConfig};

use crate::api::{AuthProvider, User};

/// Persisted form of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    #[serde(default)]
    pub user: Option<User>,
    pub logged_in_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Session {
    path: Option<PathBuf>,
    current: RwLock<Option<StoredSession>>,
}

impl Session {
    /// Session that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            current: RwLock::new(None),
        }
    }

    /// Open the session described by `config`.
    pub fn load(config: &SessionConfig) -> Result<Self> {
        match config.resolved_path() {
            Some(path) => Self::open(path),
            None => Ok(Self::in_memory()),
        }
    }

    /// Open a session file, starting logged out if it does not exist.
    ///
    /// An unreadable file is discarded rather than treated as fatal.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let current = if path.exists() {
            let content = fs::read_to_string(&path)
                .context(format!("Failed to read session file {}", path.display()))?;
            match serde_json::from_str::<StoredSession>(&content) {
                Ok(stored) => Some(stored),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Discarding corrupt session file");
                    None
                }
            }
        } else {
            None
        };

        debug!(path = %path.display(), authenticated = current.is_some(), "Session loaded");
        Ok(Self {
            path: Some(path),
            current: RwLock::new(current),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn user(&self) -> Option<User> {
        self.read().as_ref().and_then(|s| s.user.clone())
    }

    pub fn stored(&self) -> Option<StoredSession> {
        self.read().clone()
    }

    /// Start a session with a freshly issued token.
    pub fn begin(&self, access_token: impl Into<String>) -> Result<()> {
        let stored = StoredSession {
            access_token: access_token.into(),
            user: None,
            logged_in_at: Utc::now(),
        };
        self.replace(Some(stored))?;
        info!("Session started");
        Ok(())
    }

    /// Attach the user profile to the active session.
    pub fn set_user(&self, user: User) -> Result<()> {
        let Some(mut stored) = self.stored() else {
            return Err(invest_common::Error::Auth("No active session".into()));
        };
        stored.user = Some(user);
        self.replace(Some(stored))
    }

    /// End the session and forget it on disk.
    pub fn logout(&self) -> Result<()> {
        self.replace(None)?;
        info!("Session ended");
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<StoredSession>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, next: Option<StoredSession>) -> Result<()> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(path) = &self.path {
            persist(path, next.as_ref())?;
        }
        *current = next;
        Ok(())
    }
}

fn persist(path: &Path, stored: Option<&StoredSession>) -> Result<()> {
    match stored {
        Some(stored) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .context(format!("Failed to create {}", parent.display()))?;
            }
            let content = serde_json::to_string_pretty(stored)?;
            fs::write(path, content).context(format!("Failed to write session file {}", path.display()))
        }
        None => match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context(format!("Failed to remove session file {}", path.display())),
        },
    }
}

impl AuthProvider for Session {
    fn access_token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.access_token.clone())
    }

    fn on_auth_failure(&self) {
        warn!("Access token rejected; ending session");
        if let Err(e) = self.logout() {
            warn!(error = %e, "Failed to clear session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn user() -> User {
        User {
            id: 7,
            username: "ana".into(),
            email: "ana@example.com".into(),
        }
    }

    #[test]
    fn test_in_memory_session() {
        let session = Session::in_memory();
        assert!(!session.is_authenticated());

        session.begin("tok").unwrap();
        assert_eq!(session.access_token().as_deref(), Some("tok"));

        session.logout().unwrap();
        assert!(session.access_token().is_none());
    }

    #[test]
    fn test_session_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let session = Session::open(&path).unwrap();
        session.begin("tok").unwrap();
        session.set_user(user()).unwrap();

        let reopened = Session::open(&path).unwrap();
        assert_eq!(reopened.access_token().as_deref(), Some("tok"));
        assert_eq!(reopened.user(), Some(user()));
    }

    #[test]
    fn test_logout_removes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let session = Session::open(&path).unwrap();
        session.begin("tok").unwrap();
        assert!(path.exists());

        session.logout().unwrap();
        assert!(!path.exists());
        session.logout().unwrap();
    }

    #[test]
    fn test_auth_failure_ends_session() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let session = Session::open(&path).unwrap();
        session.begin("expired").unwrap();

        session.on_auth_failure();

        assert!(!session.is_authenticated());
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_starts_logged_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let session = Session::open(&path).unwrap();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_set_user_requires_session() {
        let session = Session::in_memory();
        let err = session.set_user(user()).unwrap_err();
        assert!(err.is_auth());
    }

    #[test]
    fn test_disabled_persistence() {
        let config = SessionConfig {
            persist: false,
            path: None,
        };
        let session = Session::load(&config).unwrap();
        assert!(session.path().is_none());
    }
}
