use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::api::base::{AssistantsApi, ASSISTANTS_PURPOSE};
use crate::errors::{ApiError, AssistantError, AssistantResult};
use crate::models::attachment::{classify, Attachment, PendingFile};

#[derive(Debug)]
pub struct UploadFailure {
    pub file_name: String,
    pub error: AssistantError,
}

/// Result of one upload batch. Failed files are absent from `attachments`.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub attachments: Vec<Attachment>,
    pub failures: Vec<UploadFailure>,
}

impl UploadReport {
    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.attachments
            .iter()
            .map(|attachment| attachment.file_name.as_str())
            .collect()
    }
}

pub struct AttachmentUploader {
    api: Arc<dyn AssistantsApi>,
    scratch_dir: PathBuf,
}

impl AttachmentUploader {
    pub fn new(api: Arc<dyn AssistantsApi>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Uploads every file not yet in `processed`, adding each success to it.
    pub fn upload(&self, processed: &mut HashSet<String>, files: &[PendingFile]) -> UploadReport {
        let mut report = UploadReport::default();

        for file in files {
            if processed.contains(&file.name) {
                tracing::debug!("Skipping already processed file {}", file.name);
                continue;
            }

            match self.upload_one(file) {
                Ok(attachment) => {
                    tracing::info!(
                        "Uploaded {} as {} for {}",
                        attachment.file_name,
                        attachment.file_id,
                        attachment.capability
                    );
                    processed.insert(file.name.clone());
                    report.attachments.push(attachment);
                }
                Err(error) => {
                    tracing::warn!("Error uploading file {}: {}", file.name, error);
                    report.failures.push(UploadFailure {
                        file_name: file.name.clone(),
                        error,
                    });
                }
            }
        }

        report
    }

    fn upload_one(&self, file: &PendingFile) -> AssistantResult<Attachment> {
        // Only the final path component is staged, so the copy stays inside `staging`.
        let name = Path::new(&file.name)
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| AssistantError::InvalidFileName(file.name.clone()))?;
        let capability = classify(name)?;

        let staging = self.scratch_dir.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&staging).map_err(ApiError::from)?;
        let path = staging.join(name);

        let uploaded = fs::write(&path, &file.content)
            .map_err(Into::into)
            .and_then(|_| self.api.upload_file(&path, ASSISTANTS_PURPOSE));

        if let Err(e) = fs::remove_dir_all(&staging) {
            tracing::warn!("Could not remove scratch directory {}: {}", staging.display(), e);
        }

        let uploaded = uploaded?;
        tracing::debug!(
            "Service stored {} as {}",
            uploaded.filename.as_deref().unwrap_or(name),
            uploaded.id
        );
        Ok(Attachment {
            file_id: uploaded.id,
            file_name: name.to_string(),
            capability,
        })
    }
}
