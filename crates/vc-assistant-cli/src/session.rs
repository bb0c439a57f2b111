use std::path::PathBuf;

use anyhow::Result;
use console::style;

use vc_assistant::evaluator::Evaluator;
use vc_assistant::models::attachment::PendingFile;
use vc_assistant::session::SessionContext;

use crate::prompt::{CliclackPrompt, Input};

/// One interactive REPL over an evaluator session. Errors from individual
/// commands are shown inline and the loop carries on.
pub struct Session {
    evaluator: Evaluator,
    ctx: SessionContext,
    prompt: CliclackPrompt,
}

impl Session {
    pub fn open(evaluator: Evaluator, mut prompt: CliclackPrompt) -> Result<Self> {
        prompt.show_busy("connecting to assistant");
        let ctx = evaluator.open();
        prompt.hide_busy();

        Ok(Session {
            evaluator,
            ctx: ctx?,
            prompt,
        })
    }

    pub fn start(&mut self) -> Result<()> {
        println!(
            "VC pitch evaluator {}",
            style("- type \"/?\" for help, \"exit\" to end the session").dim()
        );
        if self.ctx.thread_id.is_none() {
            self.prompt
                .render_error("No conversation available; messages will fail until /new succeeds.");
        }
        self.prompt.render_history(&self.ctx.history)?;

        loop {
            match self.prompt.get_input()? {
                Input::AskAgain => continue,
                Input::Exit => break,
                Input::Pitch(text) => self.submit_pitch(&text)?,
                Input::Upload(paths) => self.analyze_files(&paths)?,
                Input::NewConversation => self.start_new_conversation(),
                Input::History => self.show_history()?,
            }
        }
        Ok(())
    }

    fn submit_pitch(&mut self, text: &str) -> Result<()> {
        self.prompt.show_busy("evaluating");
        let result = self.evaluator.submit_pitch(&mut self.ctx, text);
        self.prompt.hide_busy();

        match result {
            Ok(outcome) => self.prompt.render(&outcome.text())?,
            Err(e) => self.prompt.render_error(&format!("Error: {}", e)),
        }
        Ok(())
    }

    fn analyze_files(&mut self, paths: &[PathBuf]) -> Result<()> {
        let mut files = Vec::new();
        for path in paths {
            match PendingFile::from_path(path) {
                Ok(file) => files.push(file),
                Err(e) => self
                    .prompt
                    .render_error(&format!("Could not read {}: {}", path.display(), e)),
            }
        }
        if files.is_empty() {
            return Ok(());
        }

        self.prompt.show_busy("uploading and analyzing files");
        let result = self.evaluator.analyze_files(&mut self.ctx, &files);
        self.prompt.hide_busy();

        let analysis = match result {
            Ok(analysis) => analysis,
            Err(e) => {
                self.prompt.render_error(&format!("Error: {}", e));
                return Ok(());
            }
        };

        for name in analysis.report.file_names() {
            self.prompt.render_notice(&format!("File uploaded: {}", name));
        }
        for failure in &analysis.report.failures {
            self.prompt.render_error(&format!(
                "Error uploading {}: {}",
                failure.file_name, failure.error
            ));
        }
        match analysis.outcome {
            Some(outcome) => self.prompt.render(&outcome.text())?,
            None => self.prompt.render_notice("No new files to analyze."),
        }
        Ok(())
    }

    fn start_new_conversation(&mut self) {
        match self.evaluator.start_new_conversation(&mut self.ctx) {
            Ok(_) => self.prompt.render_notice("Started a new conversation."),
            Err(e) => self.prompt.render_error(&format!("Error: {}", e)),
        }
    }

    fn show_history(&mut self) -> Result<()> {
        if let Err(e) = self.evaluator.load_history(&mut self.ctx) {
            self.prompt
                .render_error(&format!("Could not refresh history: {}", e));
        }
        self.prompt.render_history(&self.ctx.history)
    }
}
