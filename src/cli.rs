//! Command-line interface definition for Campus Counsel
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for serving the consultation API, chatting from a
//! terminal, inspecting history, and checking model selection.

use clap::{Parser, Subcommand};

/// Campus Counsel - anonymous campus mental-health consultation service
#[derive(Parser, Debug, Clone)]
#[command(name = "campus-counsel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Override the SQLite database used for consultation history
    #[arg(long, env = "CAMPUS_COUNSEL_HISTORY_DB")]
    pub storage_path: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Campus Counsel
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the consultation HTTP API
    Serve {
        /// Socket address to listen on (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Start an interactive consultation from the terminal
    Chat {
        /// User id the consultation belongs to
        #[arg(short, long)]
        user: String,

        /// Resume an existing session by id
        #[arg(short, long)]
        resume: Option<String>,
    },

    /// Inspect stored consultations
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Show which model the configured provider would use
    Models {
        /// Output the discovered models as JSON
        #[arg(long)]
        json: bool,
    },
}

/// History subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List a user's consultation sessions
    List {
        /// Owning user id
        #[arg(short, long)]
        user: String,
    },

    /// Show every exchange of one session
    Show {
        /// Owning user id
        #[arg(short, long)]
        user: String,

        /// Session id
        session: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_serve() {
        let cli = Cli::try_parse_from(["campus-counsel", "serve", "--bind", "127.0.0.1:3000"])
            .unwrap();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        match cli.command {
            Commands::Serve { bind } => assert_eq!(bind.as_deref(), Some("127.0.0.1:3000")),
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_chat_with_resume() {
        let cli = Cli::try_parse_from([
            "campus-counsel",
            "chat",
            "--user",
            "u1",
            "--resume",
            "abc",
        ])
        .unwrap();
        match cli.command {
            Commands::Chat { user, resume } => {
                assert_eq!(user, "u1");
                assert_eq!(resume.as_deref(), Some("abc"));
            }
            _ => panic!("Expected Chat command"),
        }
    }

    #[test]
    fn test_cli_parse_history_show() {
        let cli = Cli::try_parse_from([
            "campus-counsel",
            "--config",
            "custom.yaml",
            "history",
            "show",
            "--user",
            "u1",
            "session-1",
        ])
        .unwrap();
        assert_eq!(cli.config, Some("custom.yaml".to_string()));
        match cli.command {
            Commands::History {
                command: HistoryCommand::Show { user, session },
            } => {
                assert_eq!(user, "u1");
                assert_eq!(session, "session-1");
            }
            _ => panic!("Expected History Show command"),
        }
    }

    #[test]
    fn test_cli_chat_requires_user() {
        assert!(Cli::try_parse_from(["campus-counsel", "chat"]).is_err());
    }

    #[test]
    fn test_cli_parse_models_json() {
        let cli = Cli::try_parse_from(["campus-counsel", "-v", "models", "--json"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Models { json: true }));
    }
}
