use anstyle::{AnsiColor, Color, Style};
use bean_to_ynab::Decimal;
use bean_to_ynab::sync::SyncOutcome;
use bean_to_ynab::ynab::Milliunits;

pub fn print_outcome(account_id: &str, outcome: &SyncOutcome, scale: u32) {
    let style = match outcome {
        SyncOutcome::Disabled => Style::new().dimmed(),
        SyncOutcome::InSync { .. } => Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))),
        SyncOutcome::Adjusted { .. } => {
            Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow)))
        }
    };
    println!("{style}{}{style:#}", describe(account_id, outcome, scale));
}

fn describe(account_id: &str, outcome: &SyncOutcome, scale: u32) -> String {
    match outcome {
        SyncOutcome::Disabled => format!("Syncing is disabled for account {account_id}"),
        SyncOutcome::InSync { balance } => format!(
            "✓ Account {account_id} is in sync at {}",
            format_amount(*balance, scale)
        ),
        SyncOutcome::Adjusted {
            ledger_balance,
            remote_balance,
            amount,
        } => format!(
            "Posted an adjustment of {} to account {account_id} (ledger {}, YNAB was {})",
            format_amount(*amount, scale),
            format_amount(*ledger_balance, scale),
            format_amount(*remote_balance, scale),
        ),
    }
}

fn format_amount(amount: Milliunits, scale: u32) -> String {
    (Decimal::from(amount.0) / Decimal::from(scale))
        .normalize()
        .to_string()
}
