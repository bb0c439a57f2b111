use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use bat::WrappingMode;
use cliclack::{input, spinner, ProgressBar};
use console::style;

use vc_assistant::models::attachment::accepted_extensions;
use vc_assistant::models::message::{ChatMessage, Role};

#[derive(Debug, PartialEq)]
pub enum Input {
    /// Ask the user for input again. Control flow command.
    AskAgain,
    Pitch(String),
    Upload(Vec<PathBuf>),
    NewConversation,
    History,
    Exit,
}

#[derive(Clone, Copy)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    fn bat_theme(&self) -> &'static str {
        match self {
            Theme::Light => "GitHub",
            Theme::Dark => "zenburn",
        }
    }
}

/// Turns one line of user input into a command. Anything that is not a
/// command is a pitch.
pub fn parse_input(text: &str) -> Input {
    let text = text.trim();
    if text.is_empty() {
        return Input::AskAgain;
    }
    if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("/exit") {
        return Input::Exit;
    }
    if text.eq_ignore_ascii_case("/new") {
        return Input::NewConversation;
    }
    if text.eq_ignore_ascii_case("/history") {
        return Input::History;
    }
    if let Some(rest) = text.strip_prefix("/upload") {
        let paths: Vec<PathBuf> = rest.split_whitespace().map(PathBuf::from).collect();
        if paths.is_empty() {
            return Input::AskAgain;
        }
        return Input::Upload(paths);
    }
    Input::Pitch(text.to_string())
}

pub struct CliclackPrompt {
    spinner: Option<ProgressBar>,
    theme: Theme,
}

impl CliclackPrompt {
    pub fn new() -> Self {
        CliclackPrompt {
            spinner: None,
            theme: Theme::Dark,
        }
    }

    pub fn get_input(&mut self) -> Result<Input> {
        let message_text: String = input("Pitch:     [Help: /?]")
            .placeholder("Describe your startup")
            .multiline()
            .interact()?;

        let trimmed = message_text.trim();
        if trimmed.eq_ignore_ascii_case("/t") {
            self.theme = match self.theme {
                Theme::Light => {
                    println!("Switching to Dark theme");
                    Theme::Dark
                }
                Theme::Dark => {
                    println!("Switching to Light theme");
                    Theme::Light
                }
            };
            return Ok(Input::AskAgain);
        }
        if trimmed.eq_ignore_ascii_case("/?") {
            let extensions: Vec<_> = accepted_extensions().collect();
            println!("Commands:");
            println!("/upload <path>... - Analyze files ({})", extensions.join(", "));
            println!("/new - Start a new conversation");
            println!("/history - Show the conversation so far");
            println!("/t - Toggle Light/Dark theme");
            println!("exit - Exit the session");
            return Ok(Input::AskAgain);
        }
        Ok(parse_input(trimmed))
    }

    pub fn show_busy(&mut self, message: &str) {
        let spin = spinner();
        spin.start(message);
        self.spinner = Some(spin);
    }

    pub fn hide_busy(&mut self) {
        if let Some(spin) = self.spinner.take() {
            spin.stop("");
        }
    }

    pub fn render_history(&self, history: &[ChatMessage]) -> Result<()> {
        for message in history {
            self.render_message(message)?;
        }
        Ok(())
    }

    pub fn render_message(&self, message: &ChatMessage) -> Result<()> {
        let stamp = message.created.format("%Y-%m-%d %H:%M");
        match message.role {
            Role::User => println!(
                "{} {}",
                style(stamp).dim(),
                style(format!("You: {}", message.content)).cyan()
            ),
            Role::Assistant => {
                println!("{}", style(stamp).dim());
                self.render(&message.content)?
            }
        }
        Ok(())
    }

    pub fn render(&self, content: &str) -> Result<()> {
        bat::PrettyPrinter::new()
            .input(bat::Input::from_bytes(content.as_bytes()))
            .theme(self.theme.bat_theme())
            .language("Markdown")
            .wrapping_mode(WrappingMode::Character)
            .print()
            .map_err(|e| anyhow!("Failed to render reply: {}", e))?;
        println!();
        io::stdout().flush()?;
        Ok(())
    }

    pub fn render_error(&self, message: &str) {
        println!("{}", style(message).red());
    }

    pub fn render_notice(&self, message: &str) {
        println!("{}", style(message).dim());
    }
}
