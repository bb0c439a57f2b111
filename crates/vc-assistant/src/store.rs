use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::StoreError;

/// The remote assistant and thread this deployment talks to.
///
/// An empty string means "not known"; it is written when an id could not be
/// created and treated as absent on the next load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSession {
    #[serde(default)]
    pub assistant_id: String,
    #[serde(default)]
    pub thread_id: String,
}

impl CachedSession {
    pub fn new<A: Into<String>, T: Into<String>>(assistant_id: A, thread_id: T) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            thread_id: thread_id.into(),
        }
    }

    pub fn assistant_id(&self) -> Option<&str> {
        Some(self.assistant_id.as_str()).filter(|id| !id.is_empty())
    }

    pub fn thread_id(&self) -> Option<&str> {
        Some(self.thread_id.as_str()).filter(|id| !id.is_empty())
    }
}

/// Single-file JSON store for [`CachedSession`]. Writes are not atomic; the last
/// writer wins.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file does not exist yet.
    pub fn load(&self) -> Result<Option<CachedSession>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, session: &CachedSession) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string(session)?)?;
        Ok(())
    }

    /// Rewrites only the thread id, keeping whatever assistant id the file holds.
    /// `assistant_id` is used when the file is missing or has none.
    pub fn replace_thread(&self, assistant_id: &str, thread_id: &str) -> Result<(), StoreError> {
        let mut session = self.load()?.unwrap_or_default();
        if session.assistant_id().is_none() {
            session.assistant_id = assistant_id.to_string();
        }
        session.thread_id = thread_id.to_string();
        self.save(&session)
    }
}
