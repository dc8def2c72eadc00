/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `serve`: Run the consultation HTTP API
- `chat`: Interactive consultation from the terminal
- `history`: Inspect stored sessions and exchanges
- `models`: Show the model the configured provider would use

Handlers are small and delegate to the consultation service and the
provider layer.
*/

use crate::config::Config;
use crate::consultation::ConsultationService;
use crate::error::Result;
use crate::telemetry::TracingTelemetry;
use std::sync::Arc;

pub mod history;
pub mod models;

/// Build the consultation service shared by the command handlers
pub fn build_service(config: &Config) -> Result<Arc<ConsultationService>> {
    let service = ConsultationService::from_config(config, TracingTelemetry::shared())?;
    Ok(Arc::new(service))
}

// Serve command handler
pub mod serve {
    use super::*;

    /// Run the HTTP API until shutdown
    pub async fn run_serve(config: Config) -> Result<()> {
        tracing::info!("Starting consultation API");
        crate::telemetry::init_metrics_exporter();

        let service = build_service(&config)?;
        crate::server::serve(&config.server.bind, service).await
    }
}

// Chat command handler
pub mod chat {
    //! Interactive consultation from the terminal.
    //!
    //! Resolves (or creates) a session for the given user and sends every
    //! line typed at the prompt through the consultation service.

    use super::*;
    use crate::error::categorize;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start an interactive consultation
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `user` - User id the consultation belongs to
    /// * `resume` - Optional session id to continue
    pub async fn run_chat(config: Config, user: String, resume: Option<String>) -> Result<()> {
        tracing::info!("Starting interactive consultation");

        let service = build_service(&config)?;
        if !service.gateway().is_configured() {
            eprintln!(
                "{}",
                crate::providers::MISSING_API_KEY_MESSAGE.yellow()
            );
        }

        let session = service
            .get_or_create_session(&user, resume.as_deref())
            .await?;
        if resume
            .as_deref()
            .is_some_and(|r| !is_same_session(r, &session.id))
        {
            println!(
                "{}",
                "Could not find that session for this user; starting a new one.".yellow()
            );
        }

        let mut rl = DefaultEditor::new()?;
        print_welcome_banner(&session.id);

        loop {
            match rl.readline(&format!("{} ", "you>".green().bold())) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if matches!(trimmed, "exit" | "quit" | "/exit" | "/quit") {
                        break;
                    }
                    let _ = rl.add_history_entry(trimmed);

                    match service.send_in_session(&session, trimmed).await {
                        Ok(exchange) => {
                            println!("\n{} {}\n", "counsel>".cyan().bold(), exchange.response);
                        }
                        Err(e) => {
                            eprintln!("{} [{}] {}\n", "Error:".red(), categorize(&e), e);
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!(
            "Take care. Resume with {}",
            format!("campus-counsel chat --user {} --resume {}", user, session.id).cyan()
        );
        Ok(())
    }

    /// Whether a `--resume` argument names the resolved session
    fn is_same_session(requested: &str, session_id: &str) -> bool {
        match (
            uuid::Uuid::parse_str(requested.trim()),
            uuid::Uuid::parse_str(session_id),
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    fn print_welcome_banner(session_id: &str) {
        println!();
        println!("{}", "Campus Counsel".bold());
        println!("Session: {}", session_id.cyan());
        println!(
            "{}",
            "This is an AI assistant, not a therapist. If you are in danger, contact campus or emergency services now."
                .dimmed()
        );
        println!("Type {} to leave.\n", "exit".bold());
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_is_same_session_ignores_case_and_whitespace() {
            let id = "7d444840-9dc0-11d1-b245-5ffdce74fad2";
            assert!(is_same_session(id, id));
            assert!(is_same_session(" 7D444840-9DC0-11D1-B245-5FFDCE74FAD2 ", id));
        }

        #[test]
        fn test_is_same_session_rejects_other_ids() {
            let id = "7d444840-9dc0-11d1-b245-5ffdce74fad2";
            assert!(!is_same_session("00000000-0000-0000-0000-000000000000", id));
            assert!(!is_same_session("not-a-uuid", id));
        }
    }
}
