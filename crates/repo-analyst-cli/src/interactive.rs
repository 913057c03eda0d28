//! Menu loop and turn presentation

use std::fmt;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use console::{style, Emoji};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{InquireError, Select, Text};

use repo_analyst_core::config::AppConfig;
use repo_analyst_core::{AnalysisMode, CancellationToken, ConversationOrchestrator, Session, TurnError};

static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "");
static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
static TOOLS: Emoji<'_, '_> = Emoji("🔧 ", "");
static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR] ");
static WAVE: Emoji<'_, '_> = Emoji("👋 ", "");

pub fn banner(owner: &str, repo: &str) {
    println!();
    println!(
        "{}{} {}/{}",
        SEARCH,
        style("Analyzing repository:").bold().green(),
        owner,
        repo
    );
    println!();
}

#[derive(Debug, Clone, Copy)]
enum MenuChoice {
    Commits,
    Repo,
    Custom,
    Ask,
    Exit,
}

impl MenuChoice {
    const ALL: [MenuChoice; 5] = [
        MenuChoice::Commits,
        MenuChoice::Repo,
        MenuChoice::Custom,
        MenuChoice::Ask,
        MenuChoice::Exit,
    ];
}

impl fmt::Display for MenuChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MenuChoice::Commits => "Analyze recent commits",
            MenuChoice::Repo => "Analyze repository information",
            MenuChoice::Custom => "Custom analysis prompt",
            MenuChoice::Ask => "Ask a question",
            MenuChoice::Exit => "Exit",
        };
        f.write_str(label)
    }
}

/// Esc and Ctrl-C at a prompt end the menu
fn interrupted(e: &InquireError) -> bool {
    matches!(
        e,
        InquireError::OperationCanceled | InquireError::OperationInterrupted
    )
}

pub struct App {
    owner: String,
    repo: String,
    model_label: String,
    orchestrator: ConversationOrchestrator,
    session: Session,
}

impl App {
    pub fn new(
        owner: &str,
        repo: &str,
        config: &AppConfig,
        orchestrator: ConversationOrchestrator,
        session: Session,
    ) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            model_label: format!("{}/{}", config.model.provider, config.model.name),
            orchestrator,
            session,
        }
    }

    pub fn print_catalog(&self) {
        let catalog = self.session.catalog();
        if !self.session.tools_enabled() {
            println!("{}", style("Tools disabled: answers come from the model alone.").yellow());
            println!();
            return;
        }

        println!("{}{}", TOOLS, style("Available tools:").bold());
        for tool in catalog {
            println!("  {} {}", style(&tool.name).cyan(), style(&tool.description).dim());
        }
        println!();
    }

    /// Run a single analysis; a failed turn is a failed exit
    pub async fn run_once(&mut self, mode: &AnalysisMode) -> Result<ExitCode> {
        Ok(if self.turn(mode).await? {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    pub async fn run_menu(&mut self) -> Result<ExitCode> {
        loop {
            let choice = match Select::new("Select an analysis option:", MenuChoice::ALL.to_vec()).prompt() {
                Ok(choice) => choice,
                Err(e) if interrupted(&e) => break,
                Err(e) => return Err(e.into()),
            };

            let mode = match choice {
                MenuChoice::Commits => AnalysisMode::Commits,
                MenuChoice::Repo => AnalysisMode::Repo,
                MenuChoice::Custom => match self.ask_text("Enter your analysis prompt:")? {
                    Some(text) => AnalysisMode::Custom(text),
                    None => continue,
                },
                MenuChoice::Ask => match self.ask_text("What would you like to know?")? {
                    Some(text) => AnalysisMode::Ask(text),
                    None => continue,
                },
                MenuChoice::Exit => break,
            };

            self.turn(&mode).await?;
        }

        println!();
        println!("{}{}", WAVE, style("Thanks for using the analysis tool!").bold().green());
        Ok(ExitCode::SUCCESS)
    }

    fn ask_text(&self, message: &str) -> Result<Option<String>> {
        match Text::new(message).prompt() {
            Ok(text) if text.trim().is_empty() => Ok(None),
            Ok(text) => Ok(Some(text)),
            Err(e) if interrupted(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Run one turn with a spinner; Ctrl-C cancels the turn only
    ///
    /// Returns whether the turn produced an answer.
    async fn turn(&mut self, mode: &AnalysisMode) -> Result<bool> {
        let prompt = mode.prompt(&self.owner, &self.repo);
        let cancel = CancellationToken::new();

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        spinner.set_message(format!("Analyzing with {}...", self.model_label));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        let result = self
            .orchestrator
            .run_turn(&mut self.session, &prompt, &cancel)
            .await;
        watcher.abort();
        spinner.finish_and_clear();

        println!();
        match result {
            Ok(answer) => {
                println!("{}{}", CHART, style(format!("{}:", mode.title())).bold().cyan());
                println!();
                println!("{}", answer.trim());
                println!();
                Ok(true)
            }
            Err(TurnError::Cancelled) => {
                println!("{}", style("Cancelled.").yellow());
                println!();
                Ok(false)
            }
            Err(e) => {
                println!("{}{} {}", CROSS, style("Error:").bold().red(), e);
                println!();
                Ok(false)
            }
        }
    }

    /// Release the tool connection; failures are only logged
    pub async fn shutdown(self) {
        if let Err(e) = self.session.shutdown().await {
            tracing::warn!("Failed to close the tool connection: {}", e);
        }
    }
}
