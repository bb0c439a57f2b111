use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{to_env_var, ConfigError};

/// Config file picked up from the working directory when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "vc-assistant.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiSettings {
    #[serde(default = "default_openai_host")]
    pub host: String,
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f64>,
    #[serde(default = "default_top_p")]
    pub top_p: Option<f64>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            history_limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
    #[serde(default = "default_attachment_settle_secs")]
    pub attachment_settle_secs: u64,
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    pub fn attachment_settle(&self) -> Duration {
        Duration::from_secs(self.attachment_settle_secs)
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            drain_timeout_secs: default_drain_timeout_secs(),
            attachment_settle_secs: default_attachment_settle_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub openai: OpenAiSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub uploads: UploadSettings,
}

impl Settings {
    /// Defaults, then `vc-assistant.toml` if present, then `VC_ASSISTANT_*` variables.
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(None, &[])
    }

    /// Like [`Settings::new`], reading `config_file` (which must exist) instead of the
    /// default file. `overrides` are dotted keys applied last, e.g. CLI flags.
    pub fn load(config_file: Option<&Path>, overrides: &[(&str, String)]) -> Result<Self, ConfigError> {
        let file = config_file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut builder = Config::builder()
            .set_default("openai.host", default_openai_host())?
            .set_default("openai.model", default_model())?
            .add_source(File::from(file).required(config_file.is_some()))
            .add_source(
                Environment::with_prefix("VC_ASSISTANT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        for (key, value) in overrides {
            builder = builder.set_override(*key, value.as_str())?;
        }

        let result: Result<Self, config::ConfigError> = builder.build()?.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                if let config::ConfigError::NotFound(field) = &err {
                    return Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    });
                }
                match missing_field_path(&err.to_string()) {
                    Some(field) => Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&field),
                    }),
                    None => Err(ConfigError::Other(err)),
                }
            }
        }
    }
}

/// Extracts the settings path from "missing field `x`" style messages, qualified by
/// the enclosing key when the message names one ("... for key `openai`").
fn missing_field_path(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    let field = rest.split('`').next()?;
    match rest.split("for key `").nth(1).and_then(|k| k.split('`').next()) {
        Some(parent) if !parent.is_empty() && !field.contains('.') => {
            Some(format!("{}.{}", parent, field))
        }
        _ => Some(field.to_string()),
    }
}

fn default_openai_host() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> Option<f64> {
    Some(0.2)
}

fn default_top_p() -> Option<f64> {
    Some(0.9)
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_store_path() -> PathBuf {
    PathBuf::from("assistant_data.json")
}

fn default_history_limit() -> u32 {
    100
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_drain_timeout_secs() -> u64 {
    60
}

fn default_attachment_settle_secs() -> u64 {
    5
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("vc-assistant")
}
