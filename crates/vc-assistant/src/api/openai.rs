use reqwest::blocking::{multipart, Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

use super::base::AssistantsApi;
use super::types::{
    Assistant, AssistantSpec, FileObject, ListResponse, NewMessage, NewRun, Run, Thread,
    ThreadMessage, ToolOutput,
};
use crate::config::OpenAiSettings;
use crate::errors::{ApiError, ApiResult};

pub struct OpenAiConfig {
    pub host: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl From<&OpenAiSettings> for OpenAiConfig {
    fn from(settings: &OpenAiSettings) -> Self {
        Self {
            host: settings.host.clone(),
            api_key: settings.api_key.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

/// Assistants API v2 over blocking HTTP.
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> ApiResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.host.trim_end_matches('/'), path)
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = request
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("OpenAI-Beta", "assistants=v2")
            .send()?;

        let status = response.status();
        let body = response.text()?;
        match status {
            status if status.is_success() => Ok(serde_json::from_str(&body)?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(ApiError::Server(status.as_u16()))
            }
            status => Err(ApiError::Request {
                status: status.as_u16(),
                message: error_message(&body),
            }),
        }
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        tracing::debug!("GET {}", path);
        self.send(self.client.get(self.url(path)))
    }

    fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<T> {
        tracing::debug!("POST {}", path);
        self.send(self.client.post(self.url(path)).json(body))
    }
}

/// Pulls `error.message` out of an API error body, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

impl AssistantsApi for OpenAiClient {
    fn create_assistant(&self, spec: &AssistantSpec) -> ApiResult<Assistant> {
        self.post("assistants", spec)
    }

    fn retrieve_assistant(&self, assistant_id: &str) -> ApiResult<Assistant> {
        self.get(&format!("assistants/{}", assistant_id))
    }

    fn create_thread(&self) -> ApiResult<Thread> {
        self.post("threads", &json!({}))
    }

    fn retrieve_thread(&self, thread_id: &str) -> ApiResult<Thread> {
        self.get(&format!("threads/{}", thread_id))
    }

    fn create_message(&self, thread_id: &str, message: &NewMessage) -> ApiResult<ThreadMessage> {
        self.post(&format!("threads/{}/messages", thread_id), message)
    }

    fn list_messages(&self, thread_id: &str, limit: u32) -> ApiResult<Vec<ThreadMessage>> {
        let path = format!("threads/{}/messages?order=desc&limit={}", thread_id, limit);
        let list: ListResponse<ThreadMessage> = self.get(&path)?;
        Ok(list.data)
    }

    fn create_run(&self, thread_id: &str, run: &NewRun) -> ApiResult<Run> {
        self.post(&format!("threads/{}/runs", thread_id), run)
    }

    fn list_runs(&self, thread_id: &str) -> ApiResult<Vec<Run>> {
        let list: ListResponse<Run> = self.get(&format!("threads/{}/runs?order=desc", thread_id))?;
        Ok(list.data)
    }

    fn retrieve_run(&self, thread_id: &str, run_id: &str) -> ApiResult<Run> {
        self.get(&format!("threads/{}/runs/{}", thread_id, run_id))
    }

    fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> ApiResult<Run> {
        self.post(
            &format!("threads/{}/runs/{}/submit_tool_outputs", thread_id, run_id),
            &json!({ "tool_outputs": outputs }),
        )
    }

    fn upload_file(&self, path: &Path, purpose: &str) -> ApiResult<FileObject> {
        tracing::debug!("POST files ({})", path.display());
        let form = multipart::Form::new()
            .text("purpose", purpose.to_string())
            .file("file", path)?;
        self.send(self.client.post(self.url("files")).multipart(form))
    }
}
