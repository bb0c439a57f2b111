use thiserror::Error;

/// Failures talking to the hosted assistant service.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server error: {0}")]
    Server(u16),

    #[error("Request failed: {status}: {message}")]
    Request { status: u16, message: String },

    #[error("Could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Local I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access session file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed session file: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid tool name: {0}")]
    InvalidToolName(String),

    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("Invalid arguments for {name}: {reason}")]
    InvalidArguments { name: String, reason: String },

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Run {0} requires action but lists no tool calls")]
    NoPendingCalls(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Maps a dotted settings key to the environment variable that overrides it.
pub fn to_env_var(field_path: &str) -> String {
    format!(
        "VC_ASSISTANT_{}",
        field_path.replace('.', "__").to_uppercase()
    )
}

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Failed to create assistant: {0}")]
    AssistantCreation(#[source] ApiError),

    #[error("Failed to create thread: {0}")]
    ThreadCreation(#[source] ApiError),

    #[error("No active assistant for this session")]
    NoAssistant,

    #[error("No active conversation for this session")]
    NoConversation,

    #[error("Unsupported attachment type: {0}")]
    UnsupportedAttachment(String),

    #[error("Invalid attachment name: {0}")]
    InvalidFileName(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Prompt template error: {0}")]
    Template(#[from] tera::Error),
}

pub type AssistantResult<T> = Result<T, AssistantError>;
