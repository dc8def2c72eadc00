use crate::cli::HistoryCommand;
use crate::consultation::ConsultationService;
use crate::error::Result;
use crate::storage::{ConsultationSession, Exchange};
use colored::Colorize;
use prettytable::{format, Table};

/// Shorten `text` to at most `max` characters for table display
fn truncate(text: &str, max: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() > max {
        let head: String = single_line.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        single_line
    }
}

/// Handle history commands
pub async fn handle_history(service: &ConsultationService, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::List { user } => {
            let sessions = service.list_sessions(&user).await?;
            print_sessions(&user, &sessions);
        }
        HistoryCommand::Show { user, session } => {
            let exchanges = service.get_history(&user, &session).await?;
            print_exchanges(&session, &exchanges);
        }
    }

    Ok(())
}

fn print_sessions(user: &str, sessions: &[ConsultationSession]) {
    if sessions.is_empty() {
        println!("{}", "No consultation history found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "ID".bold(),
        "Started".bold(),
        "Last Updated".bold()
    ]);

    for session in sessions {
        table.add_row(prettytable::row![
            session.id.cyan(),
            session.created_at.format("%Y-%m-%d %H:%M"),
            session.updated_at.format("%Y-%m-%d %H:%M")
        ]);
    }

    println!("\nConsultation sessions for {}:", user);
    table.printstd();
    println!();
    println!(
        "Use {} to continue a session.",
        format!("campus-counsel chat --user {} --resume <ID>", user).cyan()
    );
    println!();
}

fn print_exchanges(session_id: &str, exchanges: &[Exchange]) {
    if exchanges.is_empty() {
        println!("{}", "This session has no exchanges yet.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "When".bold(),
        "Message".bold(),
        "Response".bold()
    ]);

    for exchange in exchanges {
        table.add_row(prettytable::row![
            exchange.created_at.format("%Y-%m-%d %H:%M:%S"),
            truncate(&exchange.message, 40),
            truncate(&exchange.response, 60)
        ]);
    }

    println!("\nSession {}:", session_id.cyan());
    table.printstd();
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_text() {
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }

    #[test]
    fn test_truncate_multibyte_and_newlines() {
        assert_eq!(truncate("héllo\nwörld", 20), "héllo wörld");
        assert_eq!(truncate("ééééééééé", 5), "éé...");
    }
}
