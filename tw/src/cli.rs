//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ticketwright - turn issue reports into structured tickets
#[derive(Parser)]
#[command(
    name = "tw",
    about = "Turn free-form issue reports into structured tickets through an LLM clarification loop",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the drafting endpoint over HTTP
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Draft a ticket interactively, answering clarification questions
    Draft {
        /// Scope keys (ui, api, backend, ...); repeat or comma-separate
        #[arg(short, long, required = true, value_delimiter = ',')]
        scope: Vec<String>,

        /// Model to use instead of the configured one
        #[arg(short, long)]
        agent: Option<String>,

        /// Print the final response as JSON
        #[arg(long)]
        json: bool,

        /// Issue description; prompted for when omitted
        text: Vec<String>,
    },

    /// List issue types and scope keys
    Types,
}

/// Location of the log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ticketwright")
        .join("logs")
        .join("ticketwright.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_draft() {
        let cli = Cli::try_parse_from(["tw", "draft", "-s", "ui,api", "--scope", "backend", "app", "crashes"]).unwrap();
        match cli.command {
            Command::Draft { scope, text, json, .. } => {
                assert_eq!(scope, vec!["ui", "api", "backend"]);
                assert_eq!(text.join(" "), "app crashes");
                assert!(!json);
            }
            other => panic!("Expected Draft, got {:?}", other),
        }
    }

    #[test]
    fn test_draft_requires_scope() {
        assert!(Cli::try_parse_from(["tw", "draft", "app crashes"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["tw", "serve", "--bind", "0.0.0.0:9000", "-l", "debug", "-c", "x.yml"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("x.yml")));
        assert!(matches!(cli.command, Command::Serve { bind: Some(_) }));
    }

    #[test]
    fn test_log_path() {
        assert!(get_log_path().ends_with("ticketwright/logs/ticketwright.log"));
    }
}
