use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{AssistantError, AssistantResult};

/// Remote analysis capability an uploaded file is made available to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Document search over the file's text.
    FileSearch,
    /// Structured-data execution in the sandboxed interpreter.
    CodeInterpreter,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::FileSearch => write!(f, "file_search"),
            Capability::CodeInterpreter => write!(f, "code_interpreter"),
        }
    }
}

/// Every accepted extension and where it is routed. Anything not listed is rejected.
const ROUTING: &[(&str, Capability)] = &[
    ("csv", Capability::CodeInterpreter),
    ("pdf", Capability::FileSearch),
    ("xlsx", Capability::FileSearch),
    ("docx", Capability::FileSearch),
    ("txt", Capability::FileSearch),
];

pub fn accepted_extensions() -> impl Iterator<Item = &'static str> {
    ROUTING.iter().map(|(ext, _)| *ext)
}

/// Routes a file by its (case-insensitive) extension.
pub fn classify(file_name: &str) -> AssistantResult<Capability> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| AssistantError::UnsupportedAttachment(file_name.to_string()))?;

    ROUTING
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, capability)| *capability)
        .ok_or_else(|| AssistantError::UnsupportedAttachment(file_name.to_string()))
}

/// A file that has been uploaded to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_id: String,
    pub file_name: String,
    pub capability: Capability,
}

impl Attachment {
    pub fn is_structured_data(&self) -> bool {
        self.capability == Capability::CodeInterpreter
    }
}

/// A local file handed over by the presentation layer, not yet uploaded.
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl PendingFile {
    pub fn new<S: Into<String>>(name: S, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("not a file path: {}", path.display()),
                )
            })?
            .to_string();
        Ok(Self::new(name, std::fs::read(path)?))
    }
}
