use std::fmt;
use std::sync::Arc;

use serde_json::json;

use crate::api::base::AssistantsApi;
use crate::api::types::{MessageAttachment, NewMessage, NewRun, Run, RunError, RunStatus};
use crate::clock::Clock;
use crate::config::PollingSettings;
use crate::errors::{ApiResult, AssistantResult, ToolError};
use crate::models::attachment::Attachment;
use crate::models::message::Role;
use crate::polling::{self, next_phase, DrainOutcome, DrainPolicy, PollEvent, RunPhase};
use crate::prompt_template::load_prompt_file;
use crate::tools::ToolRegistry;

pub const NO_RESPONSE: &str = "No response found.";
const ANALYSIS_PROMPT: &str = "analysis.md";
/// How many of the newest thread messages are searched for a run's reply.
const REPLY_SCAN_LIMIT: u32 = 20;

/// How a single exchange with the assistant ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveOutcome {
    Completed(String),
    NoResponse,
    Failed(RunStatus),
    /// Tool-call arguments could not be decoded or the outputs were rejected.
    ToolCallError(String),
}

impl DriveOutcome {
    /// The text shown to the user for this outcome.
    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DriveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveOutcome::Completed(reply) => f.write_str(reply),
            DriveOutcome::NoResponse => f.write_str(NO_RESPONSE),
            DriveOutcome::Failed(status) => write!(f, "Error: Run ended with status {}", status),
            DriveOutcome::ToolCallError(reason) => {
                write!(f, "Error in processing functions: {}", reason)
            }
        }
    }
}

/// User text followed, when files are attached, by a summary naming every file
/// and those routed to the interpreter. All references ride on the one message.
pub fn compose_message(user_text: &str, attachments: &[Attachment]) -> NewMessage {
    if attachments.is_empty() {
        return NewMessage::user(user_text);
    }

    let names: Vec<&str> = attachments.iter().map(|a| a.file_name.as_str()).collect();
    let mut summary = format!(
        "I've uploaded {} files for analysis: {}. ",
        attachments.len(),
        names.join(", ")
    );

    let structured: Vec<&str> = attachments
        .iter()
        .filter(|a| a.is_structured_data())
        .map(|a| a.file_name.as_str())
        .collect();
    if !structured.is_empty() {
        summary.push_str(&format!(
            "The following are CSV files that need code_interpreter: {}. ",
            structured.join(", ")
        ));
    }
    summary.push_str("Please analyze all files together for a comprehensive evaluation.");

    let content = if user_text.trim().is_empty() {
        summary
    } else {
        format!("{}\n\n{}", user_text, summary)
    };

    NewMessage::user(content)
        .with_attachments(attachments.iter().map(MessageAttachment::from).collect())
}

/// Per-run instructions for a file analysis; `None` for plain chat turns.
pub fn run_instructions(attachments: &[Attachment]) -> AssistantResult<Option<String>> {
    if attachments.is_empty() {
        return Ok(None);
    }

    let file_names: Vec<&str> = attachments.iter().map(|a| a.file_name.as_str()).collect();
    let has_pdf = file_names
        .iter()
        .any(|name| name.to_ascii_lowercase().ends_with(".pdf"));
    let context = json!({
        "has_csv": attachments.iter().any(Attachment::is_structured_data),
        "has_pdf": has_pdf,
        "file_names": file_names,
    });
    Ok(Some(load_prompt_file(ANALYSIS_PROMPT, &context)?))
}

/// Sends user turns into a thread and polls the resulting run to an outcome,
/// answering tool calls along the way.
pub struct ConversationDriver {
    api: Arc<dyn AssistantsApi>,
    registry: ToolRegistry,
    clock: Arc<dyn Clock>,
    polling: PollingSettings,
}

impl ConversationDriver {
    pub fn new(
        api: Arc<dyn AssistantsApi>,
        registry: ToolRegistry,
        clock: Arc<dyn Clock>,
        polling: PollingSettings,
    ) -> Self {
        Self {
            api,
            registry,
            clock,
            polling,
        }
    }

    pub fn registry_mut(&mut self) -> &mut ToolRegistry {
        &mut self.registry
    }

    pub fn drain(&self, thread_id: &str) -> ApiResult<DrainOutcome> {
        polling::drain(
            self.api.as_ref(),
            self.clock.as_ref(),
            thread_id,
            &DrainPolicy::from(&self.polling),
        )
    }

    /// Picks up the newest run that is still going, or starts a new one.
    pub fn start_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: Option<String>,
    ) -> ApiResult<Run> {
        let runs = self.api.list_runs(thread_id)?;
        if let Some(run) = runs.into_iter().find(|run| run.status.is_resumable()) {
            tracing::info!("Reusing run {} ({})", run.id, run.status);
            return Ok(run);
        }

        let run = self.api.create_run(
            thread_id,
            &NewRun {
                assistant_id: assistant_id.to_string(),
                instructions,
            },
        )?;
        tracing::info!("Created run {}", run.id);
        Ok(run)
    }

    /// Posts `user_text` (plus any attachments) and waits for the assistant's answer.
    pub fn drive(
        &self,
        thread_id: &str,
        assistant_id: &str,
        user_text: &str,
        attachments: &[Attachment],
    ) -> AssistantResult<DriveOutcome> {
        if let DrainOutcome::ActionPending { run_id } = self.drain(thread_id)? {
            let run = self.api.retrieve_run(thread_id, &run_id)?;
            match self.poll(thread_id, run)? {
                DriveOutcome::ToolCallError(reason) => {
                    return Ok(DriveOutcome::ToolCallError(reason));
                }
                settled => tracing::info!("Settled pending run {}: {:?}", run_id, settled),
            }
        }

        self.api
            .create_message(thread_id, &compose_message(user_text, attachments))?;

        if !attachments.is_empty() {
            self.drain(thread_id)?;
            self.clock.sleep(self.polling.attachment_settle());
        }

        let run = self.start_run(thread_id, assistant_id, run_instructions(attachments)?)?;
        self.poll(thread_id, run)
    }

    fn poll(&self, thread_id: &str, mut run: Run) -> AssistantResult<DriveOutcome> {
        let mut phase = next_phase(RunPhase::Polling, PollEvent::Observed(run.status));

        loop {
            match phase {
                RunPhase::Polling => {
                    self.clock.sleep(self.polling.interval());
                    run = self.api.retrieve_run(thread_id, &run.id)?;
                    tracing::debug!("Run {} status: {}", run.id, run.status);
                    phase = next_phase(phase, PollEvent::Observed(run.status));
                }
                RunPhase::AwaitingToolOutputs => {
                    if let Err(e) = self.answer_tool_calls(thread_id, &run) {
                        tracing::error!("Error in processing functions: {}", e);
                        return Ok(DriveOutcome::ToolCallError(e.to_string()));
                    }
                    phase = next_phase(phase, PollEvent::ToolOutputsSubmitted);
                }
                RunPhase::Completed => return self.reply(thread_id, &run.id),
                RunPhase::Failed(status) => {
                    match &run.last_error {
                        Some(RunError { code, message }) => tracing::warn!(
                            "Run {} ended with status {} ({}): {}",
                            run.id,
                            status,
                            code.as_deref().unwrap_or("unknown"),
                            message.as_deref().unwrap_or("no details")
                        ),
                        None => tracing::warn!("Run {} ended with status {}", run.id, status),
                    }
                    return Ok(DriveOutcome::Failed(status));
                }
            }
        }
    }

    fn answer_tool_calls(&self, thread_id: &str, run: &Run) -> AssistantResult<()> {
        let calls = run.pending_tool_calls();
        if calls.is_empty() {
            return Err(ToolError::NoPendingCalls(run.id.clone()).into());
        }

        let outputs = calls
            .iter()
            .map(|call| {
                tracing::info!("Function call requested: {}", call.function.name);
                self.registry.dispatch(call)
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.api.submit_tool_outputs(thread_id, &run.id, &outputs)?;
        Ok(())
    }

    fn reply(&self, thread_id: &str, run_id: &str) -> AssistantResult<DriveOutcome> {
        let messages = self.api.list_messages(thread_id, REPLY_SCAN_LIMIT)?;
        let reply = messages
            .iter()
            .find(|m| m.role == Role::Assistant && m.run_id.as_deref() == Some(run_id));

        Ok(match reply {
            Some(message) => DriveOutcome::Completed(message.text()),
            None => DriveOutcome::NoResponse,
        })
    }
}
