//! Ticketwright - turn issue reports into structured tickets
//!
//! CLI entry point for the HTTP endpoint and the interactive drafting session.

use std::fs;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use ticketwright::cli::{Cli, Command, get_log_path};
use ticketwright::config::Config;
use ticketwright::domain::{ISSUE_TYPES, SCOPES, TicketRequest, TicketResponse};
use ticketwright::llm::create_client;
use ticketwright::pipeline::{PipelineSettings, TicketPipeline};
use ticketwright::prompts::PromptLoader;
use ticketwright::server;
use ticketwright::session::{DraftSession, render_response};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    info!(model = %config.llm.model, environment = ?config.environment, "Ticketwright loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Serve { bind } => cmd_serve(config, bind).await,
        Command::Draft {
            scope,
            agent,
            json,
            text,
        } => cmd_draft(&config, scope, agent, json, text.join(" ")).await,
        Command::Types => cmd_types(),
    }
}

async fn cmd_serve(mut config: Config, bind: Option<String>) -> Result<()> {
    debug!(?bind, "cmd_serve: called");
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Err(e) = config.validate() {
        // Requests may still bring their own key in the header
        warn!("{}", e);
        eprintln!("{} {}", "Warning:".yellow(), e);
    }
    println!("Listening on {}", config.server.bind.bright_cyan());
    server::serve(config).await
}

async fn cmd_draft(config: &Config, scope: Vec<String>, agent: Option<String>, json: bool, text: String) -> Result<()> {
    debug!(?scope, ?agent, %json, "cmd_draft: called");
    config.validate()?;
    let api_key = config
        .llm
        .get_api_key()
        .ok_or_else(|| eyre::eyre!("LLM API key not found"))?;

    let client = create_client(&config.llm, &api_key)?;
    let prompts = Arc::new(PromptLoader::new(config.pipeline.prompts_dir.as_deref()));
    let pipeline = TicketPipeline::new(client, prompts, PipelineSettings::from_config(config));

    let request = TicketRequest {
        text: text.trim().to_string(),
        agent,
        scope,
        previous_clarifications: vec![],
    };
    // Fail on bad scope keys before prompting for anything
    request.resolve_scopes().map_err(|reason| eyre::eyre!(reason))?;

    let mut session = DraftSession::new(pipeline, request);
    let Some(response) = session.run().await? else {
        println!("Goodbye!");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!();
        println!("{}", render_response(&response));
    }

    if let TicketResponse::Error { reason, .. } = response {
        return Err(eyre::eyre!(reason));
    }
    Ok(())
}

fn cmd_types() -> Result<()> {
    debug!("cmd_types: called");
    println!("{}", "Issue types".bright_cyan().bold());
    for t in ISSUE_TYPES {
        let sections: Vec<&str> = t.sections.iter().map(|s| s.heading).collect();
        println!("  {:16} {:15} {}", t.key.yellow(), t.label, sections.join(" / ").dimmed());
        if !t.aliases.is_empty() {
            println!("  {:16} {}", "", format!("aliases: {}", t.aliases.join(", ")).dimmed());
        }
    }

    println!();
    println!("{}", "Scopes".bright_cyan().bold());
    for s in SCOPES {
        println!("  {:16} {}", s.key.yellow(), s.description);
    }
    Ok(())
}
