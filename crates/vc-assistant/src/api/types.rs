use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::attachment::{Attachment, Capability};
use crate::models::message::Role;

/// Status reported for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
        }
    }

    /// Still executing on the remote side without needing anything from us.
    pub fn is_active(&self) -> bool {
        matches!(self, RunStatus::Queued | RunStatus::InProgress)
    }

    /// A run in one of these states can be picked up again instead of starting a new one.
    pub fn is_resumable(&self) -> bool {
        self.is_active() || *self == RunStatus::RequiresAction
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tools enabled on an assistant, or attached to a message file reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantTool {
    FileSearch,
    CodeInterpreter,
    Function { function: FunctionDefinition },
}

impl From<Capability> for AssistantTool {
    fn from(capability: Capability) -> Self {
        match capability {
            Capability::FileSearch => AssistantTool::FileSearch,
            Capability::CodeInterpreter => AssistantTool::CodeInterpreter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Everything needed to create a remote assistant.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantSpec {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub tools: Vec<AssistantTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
}

/// A file reference carried by a message, tagged with the tool that may read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageAttachment {
    pub file_id: String,
    pub tools: Vec<AssistantTool>,
}

impl From<&Attachment> for MessageAttachment {
    fn from(attachment: &Attachment) -> Self {
        Self {
            file_id: attachment.file_id.clone(),
            tools: vec![attachment.capability.into()],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<MessageAttachment>,
}

impl NewMessage {
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<MessageAttachment>) -> Self {
        self.attachments = attachments;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextValue {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextValue },
    #[serde(other)]
    Other,
}

/// A message as stored in the remote conversation log.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: Vec<MessageContent>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

impl ThreadMessage {
    /// All text segments in order, joined without separators.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|content| match content {
                MessageContent::Text { text } => Some(text.value.as_str()),
                MessageContent::Other => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewRun {
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// A request from the running assistant for a locally computed result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitToolOutputs {
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequiredAction {
    pub submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

impl Run {
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        self.required_action
            .as_ref()
            .map(|action| action.submit_tool_outputs.tool_calls.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// Envelope of every list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assistant_tools_wire_format() -> anyhow::Result<()> {
        let tools = vec![
            AssistantTool::FileSearch,
            AssistantTool::CodeInterpreter,
            AssistantTool::Function {
                function: FunctionDefinition {
                    name: "lookup".to_string(),
                    description: "Look something up".to_string(),
                    parameters: json!({"type": "object"}),
                },
            },
        ];

        let value = serde_json::to_value(&tools)?;
        assert_eq!(value[0], json!({"type": "file_search"}));
        assert_eq!(value[1], json!({"type": "code_interpreter"}));
        assert_eq!(value[2]["type"], "function");
        assert_eq!(value[2]["function"]["name"], "lookup");
        Ok(())
    }

    #[test]
    fn test_message_attachment_from_attachment() -> anyhow::Result<()> {
        let attachment = Attachment {
            file_id: "file-1".to_string(),
            file_name: "competitors.csv".to_string(),
            capability: Capability::CodeInterpreter,
        };
        let value = serde_json::to_value(MessageAttachment::from(&attachment))?;
        assert_eq!(
            value,
            json!({"file_id": "file-1", "tools": [{"type": "code_interpreter"}]})
        );
        Ok(())
    }

    #[test]
    fn test_thread_message_text_skips_non_text_parts() -> anyhow::Result<()> {
        let message: ThreadMessage = serde_json::from_value(json!({
            "id": "msg_1",
            "object": "thread.message",
            "role": "assistant",
            "run_id": "run_1",
            "created_at": 1700000000,
            "content": [
                {"type": "text", "text": {"value": "Score: ", "annotations": []}},
                {"type": "image_file", "image_file": {"file_id": "file-9"}},
                {"type": "text", "text": {"value": "7/10", "annotations": []}}
            ]
        }))?;

        assert_eq!(message.text(), "Score: 7/10");
        assert_eq!(message.run_id.as_deref(), Some("run_1"));
        Ok(())
    }

    #[test]
    fn test_run_requires_action_decoding() -> anyhow::Result<()> {
        let run: Run = serde_json::from_value(json!({
            "id": "run_1",
            "object": "thread.run",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "find_similar_startups", "arguments": "{}"}
                    }]
                }
            }
        }))?;

        assert_eq!(run.status, RunStatus::RequiresAction);
        assert_eq!(run.pending_tool_calls().len(), 1);
        assert_eq!(run.pending_tool_calls()[0].function.name, "find_similar_startups");
        Ok(())
    }

    #[test]
    fn test_run_status_classes() {
        assert!(RunStatus::Queued.is_active());
        assert!(RunStatus::InProgress.is_active());
        assert!(!RunStatus::RequiresAction.is_active());
        assert!(RunStatus::RequiresAction.is_resumable());
        assert!(!RunStatus::Completed.is_resumable());
        assert_eq!(RunStatus::InProgress.to_string(), "in_progress");
    }
}
