use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::api::base::AssistantsApi;
use crate::api::types::AssistantSpec;
use crate::config::{OpenAiSettings, SessionSettings};
use crate::errors::{AssistantError, AssistantResult};
use crate::models::message::ChatMessage;
use crate::prompt_template::load_prompt_file;
use crate::session::SessionContext;
use crate::store::SessionStore;
use crate::tools::{assistant_tools, declared_functions};

pub const ASSISTANT_NAME: &str = "VC Assistant";
const ASSISTANT_PROMPT: &str = "assistant.md";

/// Model parameters used when the assistant has to be created.
#[derive(Debug, Clone)]
pub struct ModelParams {
    pub model: String,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
}

impl From<&OpenAiSettings> for ModelParams {
    fn from(settings: &OpenAiSettings) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: settings.temperature,
            top_p: settings.top_p,
        }
    }
}

/// Resolves, creates and persists the assistant and thread a session talks to.
pub struct Provisioner {
    api: Arc<dyn AssistantsApi>,
    store: SessionStore,
    params: ModelParams,
    history_limit: u32,
}

impl Provisioner {
    pub fn new(
        api: Arc<dyn AssistantsApi>,
        store: SessionStore,
        params: ModelParams,
        session: &SessionSettings,
    ) -> Self {
        Self {
            api,
            store,
            params,
            history_limit: session.history_limit,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Builds a session from the cache file, repairing whatever no longer resolves.
    ///
    /// Fails only when the assistant cannot be created. A conversation that
    /// cannot be created leaves `thread_id` empty; message operations then
    /// report [`AssistantError::NoConversation`].
    pub fn open(&self) -> AssistantResult<SessionContext> {
        let cached = match self.store.load() {
            Ok(cached) => cached.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable session file {}: {}",
                    self.store.path().display(),
                    e
                );
                Default::default()
            }
        };

        let mut ctx = SessionContext::from_cache(&cached);
        self.ensure_assistant(&mut ctx)?;
        if let Err(e) = self.ensure_conversation(&mut ctx) {
            tracing::error!("{}", e);
        }
        Ok(ctx)
    }

    pub fn ensure_assistant(&self, ctx: &mut SessionContext) -> AssistantResult<String> {
        if let Some(id) = ctx.assistant_id.clone() {
            match self.api.retrieve_assistant(&id) {
                Ok(assistant) => {
                    tracing::info!(
                        "Using existing assistant: {} ({})",
                        assistant.id,
                        assistant.name.as_deref().unwrap_or(ASSISTANT_NAME)
                    );
                    return Ok(assistant.id);
                }
                Err(e) => {
                    tracing::warn!("Cached assistant {} could not be resolved: {}", id, e);
                    ctx.assistant_id = None;
                }
            }
        }

        let spec = self.assistant_spec()?;
        let assistant = self
            .api
            .create_assistant(&spec)
            .map_err(AssistantError::AssistantCreation)?;
        tracing::info!("Created new assistant: {}", assistant.id);

        ctx.assistant_id = Some(assistant.id.clone());
        self.persist(ctx);
        Ok(assistant.id)
    }

    pub fn ensure_conversation(&self, ctx: &mut SessionContext) -> AssistantResult<String> {
        if let Some(id) = ctx.thread_id.clone() {
            match self.api.retrieve_thread(&id) {
                Ok(thread) => {
                    tracing::info!("Using existing thread: {}", thread.id);
                    return Ok(thread.id);
                }
                Err(e) => {
                    tracing::warn!("Cached thread {} could not be resolved: {}", id, e);
                    ctx.thread_id = None;
                }
            }
        }

        let thread = self
            .api
            .create_thread()
            .map_err(AssistantError::ThreadCreation)?;
        tracing::info!("Created new thread: {}", thread.id);

        ctx.thread_id = Some(thread.id.clone());
        self.persist(ctx);
        Ok(thread.id)
    }

    /// Swaps in a fresh thread. On failure the context is left as it was.
    pub fn start_new_conversation(&self, ctx: &mut SessionContext) -> AssistantResult<String> {
        let thread = self
            .api
            .create_thread()
            .map_err(AssistantError::ThreadCreation)?;
        tracing::info!("Started new conversation: {}", thread.id);

        let assistant_id = ctx.assistant_id.clone().unwrap_or_default();
        if let Err(e) = self.store.replace_thread(&assistant_id, &thread.id) {
            tracing::warn!("Failed to save session file: {}", e);
        }
        ctx.reset_conversation(thread.id.clone());
        Ok(thread.id)
    }

    /// Replaces the local history with the thread's most recent messages, oldest first.
    pub fn load_history(&self, ctx: &mut SessionContext) -> AssistantResult<()> {
        let thread_id = ctx.thread()?.to_string();
        let mut messages = self.api.list_messages(&thread_id, self.history_limit)?;
        messages.reverse();

        ctx.history = messages
            .iter()
            .map(|message| {
                let created =
                    DateTime::from_timestamp(message.created_at, 0).unwrap_or_else(Utc::now);
                ChatMessage::new(message.role, message.text()).with_created(created)
            })
            .collect();
        tracing::debug!("Loaded {} messages from {}", ctx.history.len(), thread_id);
        Ok(())
    }

    fn assistant_spec(&self) -> AssistantResult<AssistantSpec> {
        let instructions = load_prompt_file(ASSISTANT_PROMPT, &serde_json::json!({}))?;
        Ok(AssistantSpec {
            name: ASSISTANT_NAME.to_string(),
            instructions,
            model: self.params.model.clone(),
            tools: assistant_tools(declared_functions())?,
            temperature: self.params.temperature,
            top_p: self.params.top_p,
        })
    }

    fn persist(&self, ctx: &SessionContext) {
        if let Err(e) = self.store.save(&ctx.to_cache()) {
            tracing::warn!(
                "Failed to save session file {}: {}",
                self.store.path().display(),
                e
            );
        }
    }
}
