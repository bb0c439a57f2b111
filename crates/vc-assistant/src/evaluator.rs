use std::sync::Arc;

use serde_json::Value;

use crate::api::base::AssistantsApi;
use crate::api::openai::{OpenAiClient, OpenAiConfig};
use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::driver::{compose_message, ConversationDriver, DriveOutcome};
use crate::errors::{AssistantResult, ToolError};
use crate::models::attachment::PendingFile;
use crate::models::message::ChatMessage;
use crate::provisioner::{ModelParams, Provisioner};
use crate::session::SessionContext;
use crate::store::SessionStore;
use crate::tools::ToolRegistry;
use crate::uploader::{AttachmentUploader, UploadReport};

/// Appended to every free-text pitch before it is sent.
pub const PITCH_GUARDRAIL: &str =
    "\n\n(Please follow the VC evaluation framework and refuse irrelevant requests).";

#[derive(Debug)]
pub struct FileAnalysis {
    pub report: UploadReport,
    /// `None` when no file made it through the upload.
    pub outcome: Option<DriveOutcome>,
}

/// Entry point for a presentation layer: owns the provisioner, uploader and
/// driver, all sharing one API client.
pub struct Evaluator {
    provisioner: Provisioner,
    uploader: AttachmentUploader,
    driver: ConversationDriver,
}

impl Evaluator {
    pub fn new(settings: &Settings) -> AssistantResult<Self> {
        let client = OpenAiClient::new(OpenAiConfig::from(&settings.openai))?;
        Ok(Self::with_api(Arc::new(client), Arc::new(SystemClock), settings))
    }

    pub fn with_api(api: Arc<dyn AssistantsApi>, clock: Arc<dyn Clock>, settings: &Settings) -> Self {
        let provisioner = Provisioner::new(
            api.clone(),
            SessionStore::new(&settings.session.store_path),
            ModelParams::from(&settings.openai),
            &settings.session,
        );
        let uploader = AttachmentUploader::new(api.clone(), &settings.uploads.scratch_dir);
        let driver = ConversationDriver::new(
            api,
            ToolRegistry::new(),
            clock,
            settings.polling.clone(),
        );

        Self {
            provisioner,
            uploader,
            driver,
        }
    }

    /// Installs a local implementation for one of the declared functions.
    pub fn register_tool(
        &mut self,
        name: &str,
        handler: impl Fn(&Value) -> Result<Value, ToolError> + Send + Sync + 'static,
    ) -> Result<(), ToolError> {
        self.driver.registry_mut().register(name, handler)
    }

    /// Resolves the session and pulls in the existing conversation history.
    pub fn open(&self) -> AssistantResult<SessionContext> {
        let mut ctx = self.provisioner.open()?;
        if ctx.thread_id.is_some() {
            if let Err(e) = self.provisioner.load_history(&mut ctx) {
                tracing::warn!("Could not load conversation history: {}", e);
            }
        }
        Ok(ctx)
    }

    pub fn load_history(&self, ctx: &mut SessionContext) -> AssistantResult<()> {
        self.provisioner.load_history(ctx)
    }

    pub fn submit_pitch(&self, ctx: &mut SessionContext, text: &str) -> AssistantResult<DriveOutcome> {
        let thread_id = ctx.thread()?.to_string();
        let assistant_id = ctx.assistant()?.to_string();

        let prompt = format!("{}{}", text, PITCH_GUARDRAIL);
        let outcome = self.driver.drive(&thread_id, &assistant_id, &prompt, &[])?;

        ctx.history.push(ChatMessage::user(text));
        ctx.history.push(ChatMessage::assistant(outcome.text()));
        Ok(outcome)
    }

    /// Uploads `files` and asks for one evaluation covering everything that
    /// uploaded successfully.
    pub fn analyze_files(
        &self,
        ctx: &mut SessionContext,
        files: &[PendingFile],
    ) -> AssistantResult<FileAnalysis> {
        let thread_id = ctx.thread()?.to_string();
        let assistant_id = ctx.assistant()?.to_string();

        let report = self.uploader.upload(&mut ctx.processed_files, files);
        if report.is_empty() {
            return Ok(FileAnalysis {
                report,
                outcome: None,
            });
        }

        let outcome = self
            .driver
            .drive(&thread_id, &assistant_id, "", &report.attachments)?;

        ctx.history
            .push(ChatMessage::user(compose_message("", &report.attachments).content));
        ctx.history.push(ChatMessage::assistant(outcome.text()));
        Ok(FileAnalysis {
            report,
            outcome: Some(outcome),
        })
    }

    pub fn start_new_conversation(&self, ctx: &mut SessionContext) -> AssistantResult<String> {
        self.provisioner.start_new_conversation(ctx)
    }
}
