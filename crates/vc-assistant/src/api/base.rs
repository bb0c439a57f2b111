use std::path::Path;

use super::types::{
    Assistant, AssistantSpec, FileObject, NewMessage, NewRun, Run, Thread, ThreadMessage,
    ToolOutput,
};
use crate::errors::ApiResult;

/// Purpose tag for files consumed by assistants.
pub const ASSISTANTS_PURPOSE: &str = "assistants";

/// The hosted assistant service: assistants, threads, messages, runs and files.
///
/// Every call blocks until the service answers. Lists come back newest-first.
pub trait AssistantsApi: Send + Sync {
    fn create_assistant(&self, spec: &AssistantSpec) -> ApiResult<Assistant>;

    /// Existence check for a cached assistant id.
    fn retrieve_assistant(&self, assistant_id: &str) -> ApiResult<Assistant>;

    fn create_thread(&self) -> ApiResult<Thread>;

    /// Existence check for a cached thread id.
    fn retrieve_thread(&self, thread_id: &str) -> ApiResult<Thread>;

    fn create_message(&self, thread_id: &str, message: &NewMessage) -> ApiResult<ThreadMessage>;

    fn list_messages(&self, thread_id: &str, limit: u32) -> ApiResult<Vec<ThreadMessage>>;

    fn create_run(&self, thread_id: &str, run: &NewRun) -> ApiResult<Run>;

    fn list_runs(&self, thread_id: &str) -> ApiResult<Vec<Run>>;

    fn retrieve_run(&self, thread_id: &str, run_id: &str) -> ApiResult<Run>;

    /// Answers every pending tool call of a run in one batch and lets it resume.
    fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> ApiResult<Run>;

    fn upload_file(&self, path: &Path, purpose: &str) -> ApiResult<FileObject>;
}
