//! Campus Counsel - anonymous campus mental-health consultation service
//!
#![doc = "Main entry point for the Campus Counsel service and CLI."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use campus_counsel::cli::{Cli, Commands};
use campus_counsel::commands;
use campus_counsel::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Serve { .. } => {
            commands::serve::run_serve(config).await?;
            Ok(())
        }
        Commands::Chat { user, resume } => {
            if let Some(r) = &resume {
                tracing::debug!("Resuming consultation: {}", r);
            }
            commands::chat::run_chat(config, user, resume).await?;
            Ok(())
        }
        Commands::History { command } => {
            tracing::info!("Starting history command");
            let service = commands::build_service(&config)?;
            commands::history::handle_history(&service, command).await?;
            Ok(())
        }
        Commands::Models { json } => {
            commands::models::show_models(&config, json).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "campus_counsel=debug"
    } else {
        "campus_counsel=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
