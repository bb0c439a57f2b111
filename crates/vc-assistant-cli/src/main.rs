use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use std::path::PathBuf;

use vc_assistant::config::Settings;
use vc_assistant::errors::{to_env_var, ConfigError};
use vc_assistant::evaluator::Evaluator;

mod prompt;
mod session;

use prompt::CliclackPrompt;
use session::Session;

#[derive(Parser)]
#[command(author, version, about = "Evaluate startup pitches with an OpenAI assistant", long_about = None)]
struct Cli {
    /// Settings file (defaults to ./vc-assistant.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// OpenAI API Key (can also be set via VC_ASSISTANT_OPENAI__API_KEY or OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Model used when the assistant has to be created
    #[arg(short, long)]
    model: Option<String>,

    /// Where the assistant and thread ids are cached
    #[arg(long)]
    store: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let settings = load_settings(&cli)?;
    tracing::debug!(
        "Using model {} with session file {}",
        settings.openai.model,
        settings.session.store_path.display()
    );
    let evaluator = Evaluator::new(&settings).context("Failed to build the OpenAI client")?;

    let mut session = Session::open(evaluator, CliclackPrompt::new())?;
    session.start()
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vc_assistant=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut overrides: Vec<(&str, String)> = Vec::new();
    if let Some(api_key) = &cli.api_key {
        overrides.push(("openai.api_key", api_key.clone()));
    }
    if let Some(model) = &cli.model {
        overrides.push(("openai.model", model.clone()));
    }
    if let Some(store) = &cli.store {
        overrides.push(("session.store_path", store.display().to_string()));
    }

    match Settings::load(cli.config.as_deref(), &overrides) {
        Err(ConfigError::MissingEnvVar { env_var }) if env_var == to_env_var("openai.api_key") => {
            let api_key = env::var("OPENAI_API_KEY").with_context(|| {
                format!("No API key configured: set {} or OPENAI_API_KEY", env_var)
            })?;
            overrides.push(("openai.api_key", api_key));
            Ok(Settings::load(cli.config.as_deref(), &overrides)?)
        }
        result => Ok(result?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "vc-assistant",
            "--api-key",
            "sk-test",
            "--model",
            "gpt-4o",
            "--store",
            "/tmp/assistant_data.json",
        ]);
        assert_eq!(cli.api_key.as_deref(), Some("sk-test"));
        assert_eq!(cli.model.as_deref(), Some("gpt-4o"));
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/assistant_data.json")));
        assert!(cli.config.is_none());
    }
}
