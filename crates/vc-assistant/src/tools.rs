use regex::Regex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::OnceLock;

use crate::api::types::{AssistantTool, FunctionDefinition, ToolCall, ToolOutput};
use crate::errors::ToolError;

pub const FIND_LINKEDIN_PROFILES: &str = "find_linkedin_profiles";
pub const FIND_SIMILAR_STARTUPS: &str = "find_similar_startups";

/// Callback invoked with the decoded JSON arguments of a tool call.
pub type ToolHandler = Box<dyn Fn(&Value) -> Result<Value, ToolError> + Send + Sync>;

/// Result returned for any function without a registered handler.
pub fn not_implemented() -> Value {
    json!({ "error": "Function not implemented" })
}

fn is_valid_function_name(name: &str) -> bool {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]{1,64}$").unwrap())
        .is_match(name)
}

/// A callback function declared to the remote assistant.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTool {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

impl FunctionTool {
    pub fn new<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

impl From<FunctionTool> for AssistantTool {
    fn from(tool: FunctionTool) -> Self {
        AssistantTool::Function {
            function: FunctionDefinition {
                name: tool.name,
                description: tool.description,
                parameters: tool.parameters,
            },
        }
    }
}

/// The two lookups the evaluator may ask for while reviewing a pitch.
pub fn declared_functions() -> Vec<FunctionTool> {
    vec![
        FunctionTool::new(
            FIND_LINKEDIN_PROFILES,
            "Find LinkedIn profiles for startup team members based on their names and company details",
            json!({
                "type": "object",
                "properties": {
                    "team_members": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": {
                                    "type": "string",
                                    "description": "Full name of the team member"
                                },
                                "role": {
                                    "type": "string",
                                    "description": "Role or title of the team member"
                                },
                                "company": {
                                    "type": "string",
                                    "description": "Company or startup name"
                                }
                            }
                        },
                        "description": "List of team members to find LinkedIn profiles for"
                    }
                },
                "required": ["team_members"]
            }),
        ),
        FunctionTool::new(
            FIND_SIMILAR_STARTUPS,
            "Find similar startups based on the business description and industry",
            json!({
                "type": "object",
                "properties": {
                    "business_description": {
                        "type": "string",
                        "description": "Brief description of the startup's business model or product"
                    },
                    "industry": {
                        "type": "string",
                        "description": "Industry or sector of the startup"
                    },
                    "keywords": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Keywords related to the startup's product or service"
                    }
                },
                "required": ["business_description"]
            }),
        ),
    ]
}

/// Capability list sent when creating the assistant: document search, the
/// interpreter, then every declared function.
pub fn assistant_tools(functions: Vec<FunctionTool>) -> Result<Vec<AssistantTool>, ToolError> {
    let mut names = HashSet::new();
    let mut tools = vec![AssistantTool::FileSearch, AssistantTool::CodeInterpreter];

    for function in functions {
        if !is_valid_function_name(&function.name) {
            return Err(ToolError::InvalidToolName(function.name));
        }
        if !names.insert(function.name.clone()) {
            return Err(ToolError::DuplicateTool(function.name));
        }
        tools.push(function.into());
    }
    Ok(tools)
}

/// Maps function names to local handlers. Calls to names without a handler are
/// answered with [`not_implemented`].
#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<String, ToolHandler>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: &str,
        handler: impl Fn(&Value) -> Result<Value, ToolError> + Send + Sync + 'static,
    ) -> Result<(), ToolError> {
        if !is_valid_function_name(name) {
            return Err(ToolError::InvalidToolName(name.to_string()));
        }
        if self.handlers.contains_key(name) {
            return Err(ToolError::DuplicateTool(name.to_string()));
        }
        self.handlers.insert(name.to_string(), Box::new(handler));
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Decodes the call's arguments and produces its output, keyed to the call id.
    pub fn dispatch(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let name = &call.function.name;
        let arguments: Value = serde_json::from_str(&call.function.arguments).map_err(|e| {
            ToolError::InvalidArguments {
                name: name.clone(),
                reason: e.to_string(),
            }
        })?;

        let result = match self.handlers.get(name) {
            Some(handler) => handler(&arguments)?,
            None => {
                tracing::debug!("No handler registered for {}", name);
                not_implemented()
            }
        };

        Ok(ToolOutput {
            tool_call_id: call.id.clone(),
            output: result.to_string(),
        })
    }
}

impl Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("ToolRegistry")
            .field("handlers", &names)
            .finish()
    }
}
