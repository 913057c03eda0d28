//! repo-analyst: ask an LLM questions about a GitHub repository
//!
//! The interactive client spawns its own executable with `serve` as the MCP
//! tool server, so one binary provides both ends of the tool channel.

mod interactive;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repo_analyst_core::config::{AppConfig, FileConfigProvider};
use repo_analyst_core::github::{register_tools, GitHubClient};
use repo_analyst_core::mcp::{McpError, McpResult, ToolInvocationClient, ToolServer};
use repo_analyst_core::{
    create_provider, system_prompt, AnalysisMode, ConversationOrchestrator, EnvSecretStore,
    SecretStore, Session, SharedLogger, ToolRegistry, TracingLogger,
};

/// RUST_LOG for the spawned tool server unless the operator set one
const CHILD_LOG_FILTER: &str = "repo_analyst=warn";

#[derive(Parser, Debug)]
#[command(
    name = "repo-analyst",
    version,
    about = "GitHub Repository Analysis Tool",
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Repository owner
    #[arg(required = true)]
    owner: Option<String>,

    /// Repository name
    #[arg(required = true)]
    repo: Option<String>,

    /// Answer without calling any tools
    #[arg(long)]
    no_tools: bool,

    /// Run one analysis and exit instead of showing the menu
    #[arg(long, value_parser = AnalysisMode::NAMES)]
    mode: Option<String>,

    /// Prompt text for the `custom` and `ask` modes
    #[arg(long)]
    prompt: Option<String>,

    /// LLM provider (ollama, openai, anthropic, ...)
    #[arg(long)]
    provider: Option<String>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// Maximum tool rounds per turn
    #[arg(long)]
    round_limit: Option<usize>,

    /// Log at info level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ~/.config/repo-analyst/config.yaml)
    #[arg(long, global = true, env = "REPO_ANALYST_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the GitHub tool server over stdio (MCP)
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli) {
        eprintln!("Error: {e:?}");
        return ExitCode::FAILURE;
    }

    let result = match &cli.command {
        Some(Command::Serve) => serve(&cli).await.map(|_| ExitCode::SUCCESS),
        None => analyze(&cli).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", style("Error:").bold().red());
            ExitCode::FAILURE
        }
    }
}

/// Logs always go to stderr; in `serve` mode stdout carries the protocol
fn init_tracing(cli: &Cli) -> Result<()> {
    let default = if cli.verbose || cli.command.is_some() {
        "repo_analyst=info"
    } else {
        "repo_analyst=warn"
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(default.parse()?))
        .init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let provider = match &cli.config {
        Some(path) => FileConfigProvider::new(path),
        None => FileConfigProvider::user(),
    };
    let mut config = provider
        .load_with_env()
        .with_context(|| format!("Failed to load configuration from {}", provider.path().display()))?;

    if let Some(name) = &cli.provider {
        config.model.provider = name.clone();
    }
    if let Some(model) = &cli.model {
        config.model.name = model.clone();
    }
    if let Some(limit) = cli.round_limit {
        config.session.round_limit = limit;
    }
    if cli.no_tools {
        config.session.tools_enabled = false;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn serve(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let logger: SharedLogger = Arc::new(TracingLogger::for_component("tool_server"));

    let source = GitHubClient::from_settings(&config.github, &EnvSecretStore::new(), logger.clone())
        .context("Failed to create GitHub client")?;
    let registry = register_tools(
        ToolRegistry::builder().with_logger(logger.clone()),
        Arc::new(source),
        config.github.default_commit_limit,
    )?
    .build();

    tracing::info!("Starting GitHub analysis tool server ({} tools)", registry.len());
    ToolServer::new(Arc::new(registry), logger).serve_stdio().await?;
    Ok(())
}

async fn connect(
    config: &AppConfig,
    config_path: Option<&Path>,
    logger: SharedLogger,
) -> McpResult<ToolInvocationClient> {
    let timeout = config.session.connect_timeout();

    let client = match &config.session.server_url {
        Some(url) => ToolInvocationClient::connect_http(url, timeout, logger).await?,
        None => {
            let exe = std::env::current_exe().map_err(|e| {
                McpError::ConnectionFailed(format!("cannot locate own executable: {}", e))
            })?;

            let mut args = vec!["serve".to_string()];
            if let Some(path) = config_path {
                args.push("--config".to_string());
                args.push(path.display().to_string());
            }

            let mut env = Vec::new();
            if std::env::var_os("RUST_LOG").is_none() {
                env.push(("RUST_LOG".to_string(), CHILD_LOG_FILTER.to_string()));
            }

            ToolInvocationClient::connect_child_process(exe, args, env, timeout, logger).await?
        }
    };

    Ok(client.with_parallel(config.session.parallel_tools))
}

async fn analyze(cli: &Cli) -> Result<ExitCode> {
    let (Some(owner), Some(repo)) = (cli.owner.as_deref(), cli.repo.as_deref()) else {
        bail!("OWNER and REPO are required");
    };
    let mode = match &cli.mode {
        Some(name) => Some(AnalysisMode::from_name(name, cli.prompt.clone())?),
        None => None,
    };

    let config = load_config(cli)?;
    let logger: SharedLogger = Arc::new(TracingLogger::for_component("client"));
    let secrets: Arc<dyn SecretStore> = Arc::new(EnvSecretStore::new());

    interactive::banner(owner, repo);

    let session = if config.session.tools_enabled {
        Session::establish(
            |tools| Some(system_prompt(owner, repo, tools)),
            connect(&config, cli.config.as_deref(), logger.clone()),
            config.session.on_connect_failure,
            &logger,
        )
        .await
        .context("Could not connect to the tool server")?
    } else {
        Session::without_tools(Some(system_prompt(owner, repo, false)))
    };

    let provider = create_provider(&config.model.provider, secrets, logger.clone());
    let orchestrator = ConversationOrchestrator::from_config(provider, &config, logger);

    let mut app = interactive::App::new(owner, repo, &config, orchestrator, session);
    app.print_catalog();

    let result = match mode {
        Some(mode) => app.run_once(&mode).await,
        None => app.run_menu().await,
    };

    app.shutdown().await;
    result
}
