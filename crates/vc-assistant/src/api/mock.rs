use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use super::base::AssistantsApi;
use super::types::{
    Assistant, AssistantSpec, FileObject, FunctionCall, MessageContent, NewMessage, NewRun,
    RequiredAction, Run, RunStatus, SubmitToolOutputs, TextValue, Thread, ThreadMessage,
    ToolCall, ToolOutput,
};
use crate::errors::{ApiError, ApiResult};
use crate::models::message::Role;

#[derive(Default)]
struct MockState {
    next_id: u32,
    assistants: HashSet<String>,
    // oldest first
    threads: HashMap<String, Vec<ThreadMessage>>,
    runs: HashMap<String, Vec<Run>>,
    status_script: VecDeque<RunStatus>,
    list_script: VecDeque<Vec<RunStatus>>,
    tool_calls: Vec<ToolCall>,
    reply: Option<String>,
    fail_assistant_creation: bool,
    fail_thread_creation: bool,
    fail_submit: bool,
    fail_uploads: HashSet<String>,
    created_specs: Vec<AssistantSpec>,
    created_messages: Vec<NewMessage>,
    created_runs: Vec<NewRun>,
    submitted: Vec<Vec<ToolOutput>>,
    uploads: Vec<(String, Vec<u8>)>,
    list_runs_calls: usize,
}

impl MockState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_{}", prefix, self.next_id)
    }

    /// Message timestamps follow creation order.
    fn stamp(&self) -> i64 {
        1_700_000_000 + i64::from(self.next_id)
    }
}

fn not_found(kind: &str, id: &str) -> ApiError {
    ApiError::Request {
        status: 404,
        message: format!("No {} found with id '{}'.", kind, id),
    }
}

fn text_message(
    id: String,
    role: Role,
    text: &str,
    run_id: Option<String>,
    created_at: i64,
) -> ThreadMessage {
    ThreadMessage {
        id,
        role,
        content: vec![MessageContent::Text {
            text: TextValue {
                value: text.to_string(),
            },
        }],
        run_id,
        created_at,
    }
}

pub fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

/// In-memory stand-in for the hosted service with scriptable run behaviour.
///
/// `retrieve_run` serves statuses from the status script (falling back to
/// `completed` once it runs dry); a run that reaches `completed` gets the
/// configured reply appended to its thread.
#[derive(Default)]
pub struct MockAssistantsApi {
    state: Mutex<MockState>,
}

impl MockAssistantsApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assistant(self, assistant_id: &str) -> Self {
        self.state.lock().unwrap().assistants.insert(assistant_id.to_string());
        self
    }

    pub fn with_thread(self, thread_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .threads
            .insert(thread_id.to_string(), Vec::new());
        self
    }

    pub fn with_message(self, thread_id: &str, role: Role, text: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = state.id("msg");
            let created_at = state.stamp();
            state
                .threads
                .entry(thread_id.to_string())
                .or_default()
                .push(text_message(id, role, text, None, created_at));
        }
        self
    }

    pub fn with_run(self, thread_id: &str, run_id: &str, status: RunStatus) -> Self {
        self.state
            .lock()
            .unwrap()
            .runs
            .entry(thread_id.to_string())
            .or_default()
            .push(Run {
                id: run_id.to_string(),
                status,
                required_action: None,
                last_error: None,
            });
        self
    }

    pub fn with_statuses(self, statuses: Vec<RunStatus>) -> Self {
        self.state.lock().unwrap().status_script = statuses.into();
        self
    }

    /// Each entry is the set of run statuses one `list_runs` call reports.
    pub fn with_listings(self, listings: Vec<Vec<RunStatus>>) -> Self {
        self.state.lock().unwrap().list_script = listings.into();
        self
    }

    pub fn with_tool_calls(self, tool_calls: Vec<ToolCall>) -> Self {
        self.state.lock().unwrap().tool_calls = tool_calls;
        self
    }

    pub fn with_reply(self, reply: &str) -> Self {
        self.state.lock().unwrap().reply = Some(reply.to_string());
        self
    }

    pub fn failing_assistant_creation(self) -> Self {
        self.state.lock().unwrap().fail_assistant_creation = true;
        self
    }

    pub fn failing_thread_creation(self) -> Self {
        self.state.lock().unwrap().fail_thread_creation = true;
        self
    }

    pub fn failing_submit(self) -> Self {
        self.state.lock().unwrap().fail_submit = true;
        self
    }

    pub fn failing_upload(self, file_name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_uploads
            .insert(file_name.to_string());
        self
    }

    pub fn set_thread_creation_failure(&self, fail: bool) {
        self.state.lock().unwrap().fail_thread_creation = fail;
    }

    pub fn assistant_specs(&self) -> Vec<AssistantSpec> {
        self.state.lock().unwrap().created_specs.clone()
    }

    pub fn thread_count(&self) -> usize {
        self.state.lock().unwrap().threads.len()
    }

    pub fn created_messages(&self) -> Vec<NewMessage> {
        self.state.lock().unwrap().created_messages.clone()
    }

    pub fn created_runs(&self) -> Vec<NewRun> {
        self.state.lock().unwrap().created_runs.clone()
    }

    pub fn submitted_outputs(&self) -> Vec<Vec<ToolOutput>> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn list_runs_calls(&self) -> usize {
        self.state.lock().unwrap().list_runs_calls
    }
}

impl AssistantsApi for MockAssistantsApi {
    fn create_assistant(&self, spec: &AssistantSpec) -> ApiResult<Assistant> {
        let mut state = self.state.lock().unwrap();
        if state.fail_assistant_creation {
            return Err(ApiError::Server(500));
        }
        let id = state.id("asst");
        state.assistants.insert(id.clone());
        state.created_specs.push(spec.clone());
        Ok(Assistant {
            id,
            name: Some(spec.name.clone()),
        })
    }

    fn retrieve_assistant(&self, assistant_id: &str) -> ApiResult<Assistant> {
        let state = self.state.lock().unwrap();
        if state.assistants.contains(assistant_id) {
            Ok(Assistant {
                id: assistant_id.to_string(),
                name: None,
            })
        } else {
            Err(not_found("assistant", assistant_id))
        }
    }

    fn create_thread(&self) -> ApiResult<Thread> {
        let mut state = self.state.lock().unwrap();
        if state.fail_thread_creation {
            return Err(ApiError::Server(503));
        }
        let id = state.id("thread");
        state.threads.insert(id.clone(), Vec::new());
        Ok(Thread { id })
    }

    fn retrieve_thread(&self, thread_id: &str) -> ApiResult<Thread> {
        let state = self.state.lock().unwrap();
        if state.threads.contains_key(thread_id) {
            Ok(Thread {
                id: thread_id.to_string(),
            })
        } else {
            Err(not_found("thread", thread_id))
        }
    }

    fn create_message(&self, thread_id: &str, message: &NewMessage) -> ApiResult<ThreadMessage> {
        let mut state = self.state.lock().unwrap();
        if !state.threads.contains_key(thread_id) {
            return Err(not_found("thread", thread_id));
        }
        let id = state.id("msg");
        let stored = text_message(id, message.role, &message.content, None, state.stamp());
        state.created_messages.push(message.clone());
        if let Some(log) = state.threads.get_mut(thread_id) {
            log.push(stored.clone());
        }
        Ok(stored)
    }

    fn list_messages(&self, thread_id: &str, limit: u32) -> ApiResult<Vec<ThreadMessage>> {
        let state = self.state.lock().unwrap();
        let log = state
            .threads
            .get(thread_id)
            .ok_or_else(|| not_found("thread", thread_id))?;
        Ok(log.iter().rev().take(limit as usize).cloned().collect())
    }

    fn create_run(&self, thread_id: &str, run: &NewRun) -> ApiResult<Run> {
        let mut state = self.state.lock().unwrap();
        if !state.threads.contains_key(thread_id) {
            return Err(not_found("thread", thread_id));
        }
        let created = Run {
            id: state.id("run"),
            status: RunStatus::Queued,
            required_action: None,
            last_error: None,
        };
        state.created_runs.push(run.clone());
        state
            .runs
            .entry(thread_id.to_string())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    fn list_runs(&self, thread_id: &str) -> ApiResult<Vec<Run>> {
        let mut state = self.state.lock().unwrap();
        state.list_runs_calls += 1;
        if let Some(statuses) = state.list_script.pop_front() {
            return Ok(statuses
                .into_iter()
                .enumerate()
                .map(|(i, status)| Run {
                    id: format!("run_listed_{}", i),
                    status,
                    required_action: None,
                    last_error: None,
                })
                .collect());
        }
        Ok(state
            .runs
            .get(thread_id)
            .map(|runs| runs.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    fn retrieve_run(&self, thread_id: &str, run_id: &str) -> ApiResult<Run> {
        let mut state = self.state.lock().unwrap();
        let status = state
            .status_script
            .pop_front()
            .unwrap_or(RunStatus::Completed);
        let required_action = (status == RunStatus::RequiresAction).then(|| RequiredAction {
            submit_tool_outputs: SubmitToolOutputs {
                tool_calls: state.tool_calls.clone(),
            },
        });

        let run = Run {
            id: run_id.to_string(),
            status,
            required_action,
            last_error: None,
        };

        let known = state
            .runs
            .get_mut(thread_id)
            .and_then(|runs| runs.iter_mut().find(|r| r.id == run_id))
            .map(|stored| {
                let first_completion =
                    stored.status != RunStatus::Completed && status == RunStatus::Completed;
                stored.status = status;
                first_completion
            })
            .ok_or_else(|| not_found("run", run_id))?;

        if known {
            if let Some(reply) = state.reply.clone() {
                let id = state.id("msg");
                let message = text_message(
                    id,
                    Role::Assistant,
                    &reply,
                    Some(run_id.to_string()),
                    state.stamp(),
                );
                state.threads.entry(thread_id.to_string()).or_default().push(message);
            }
        }
        Ok(run)
    }

    fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> ApiResult<Run> {
        let mut state = self.state.lock().unwrap();
        if state.fail_submit {
            return Err(ApiError::Request {
                status: 400,
                message: format!("Run {} is not awaiting tool outputs", run_id),
            });
        }
        state.submitted.push(outputs.to_vec());
        Ok(Run {
            id: run_id.to_string(),
            status: RunStatus::Queued,
            required_action: None,
            last_error: None,
        })
    }

    fn upload_file(&self, path: &Path, _purpose: &str) -> ApiResult<FileObject> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let content = std::fs::read(path)?;

        let mut state = self.state.lock().unwrap();
        if state.fail_uploads.contains(&name) {
            return Err(ApiError::Server(502));
        }
        let id = state.id("file");
        state.uploads.push((name.clone(), content));
        Ok(FileObject {
            id,
            filename: Some(name),
        })
    }
}
