use std::collections::HashSet;

use crate::errors::{AssistantError, AssistantResult};
use crate::models::message::ChatMessage;
use crate::store::CachedSession;

/// Everything one user session carries between operations.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub assistant_id: Option<String>,
    pub thread_id: Option<String>,
    /// Local view of the conversation, oldest first.
    pub history: Vec<ChatMessage>,
    /// Names of files already uploaded into the current conversation.
    pub processed_files: HashSet<String>,
}

impl SessionContext {
    pub fn from_cache(cached: &CachedSession) -> Self {
        Self {
            assistant_id: cached.assistant_id().map(str::to_string),
            thread_id: cached.thread_id().map(str::to_string),
            ..Self::default()
        }
    }

    pub fn to_cache(&self) -> CachedSession {
        CachedSession::new(
            self.assistant_id.clone().unwrap_or_default(),
            self.thread_id.clone().unwrap_or_default(),
        )
    }

    pub fn assistant(&self) -> AssistantResult<&str> {
        self.assistant_id
            .as_deref()
            .ok_or(AssistantError::NoAssistant)
    }

    pub fn thread(&self) -> AssistantResult<&str> {
        self.thread_id
            .as_deref()
            .ok_or(AssistantError::NoConversation)
    }

    /// Switches to a fresh conversation, dropping everything tied to the old one.
    pub fn reset_conversation(&mut self, thread_id: String) {
        self.thread_id = Some(thread_id);
        self.history.clear();
        self.processed_files.clear();
    }
}
