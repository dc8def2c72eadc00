//! Model inspection command
//!
//! For the generative language dialect this lists the discovered candidate
//! models and the one the resolver would pick right now; for
//! chat-completions endpoints it prints the configured model.

use crate::config::Config;
use crate::error::{CounselError, Result};
use crate::providers::{self, Dialect, ModelInfo, MISSING_API_KEY_MESSAGE};
use prettytable::{row, Table};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ModelsReport {
    dialect: String,
    selected: String,
    models: Vec<ModelInfo>,
}

/// Show the models the configured provider would choose from
///
/// # Errors
///
/// Returns [`CounselError::ConfigurationMissing`] when no API key is set.
/// Discovery failures are reported as warnings; the fallback model is
/// shown instead.
pub async fn show_models(config: &Config, json: bool) -> Result<()> {
    if config.llm.api_key().is_none() {
        return Err(CounselError::ConfigurationMissing(MISSING_API_KEY_MESSAGE.to_string()).into());
    }

    let provider = providers::create_provider(&config.llm)?;
    let dialect = provider.dialect();
    tracing::info!("Inspecting models for {} endpoint", dialect);

    let models = match provider.list_models().await {
        Ok(models) => models,
        Err(e) => {
            tracing::warn!("Model listing failed: {:#}", e);
            Vec::new()
        }
    };
    let selected = provider.current_model().await?;

    let report = ModelsReport {
        dialect: dialect.to_string(),
        selected,
        models,
    };

    if json {
        let out = serde_json::to_string_pretty(&report).map_err(CounselError::Serialization)?;
        println!("{}", out);
    } else {
        print_report(&report, dialect);
    }

    Ok(())
}

fn print_report(report: &ModelsReport, dialect: Dialect) {
    if report.models.is_empty() {
        println!("No usable models were listed by the provider.");
    } else {
        let mut table = Table::new();
        table.add_row(row!["Model Name", "Display Name", "Selected"]);
        for model in &report.models {
            let selected = if model.name == report.selected { "*" } else { "" };
            table.add_row(row![model.name, model.display_name, selected]);
        }
        println!("\nModels available to the {} endpoint:\n", dialect);
        table.printstd();
    }
    println!("\nModel in use: {}\n", report.selected);
}
