use crate::mapping::SyncMapping;
use crate::query::BalanceQuery;
use crate::ynab::{self, Milliunits, NewTransaction};
use crate::{Decimal, Ledger};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub budget_id: String,
    /// Number of YNAB amount units per ledger currency unit.
    pub scale: u32,
    /// Post an adjustment even if the balances already agree.
    pub post_zero_difference: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            budget_id: ynab::LAST_USED_BUDGET.to_owned(),
            scale: 1000,
            post_zero_difference: false,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("could not find any account with id {0}")]
    AccountNotFound(String),
    #[error("account {name:?} is not a tracking account")]
    NotTrackingAccount { name: String },
    #[error("amount {0} is out of range for YNAB amounts")]
    OutOfRange(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The account's mapping has syncing turned off.
    Disabled,
    InSync { balance: Milliunits },
    Adjusted {
        ledger_balance: Milliunits,
        remote_balance: Milliunits,
        amount: Milliunits,
    },
}

/// Convert a ledger amount to YNAB units, truncating towards zero.
pub fn to_milliunits(number: Decimal, scale: u32) -> Result<Milliunits, SyncError> {
    number
        .checked_mul(Decimal::from(scale))
        .and_then(|scaled| scaled.trunc().to_i64())
        .map(Milliunits)
        .ok_or(SyncError::OutOfRange(number))
}

/// Amount that moves the YNAB balance onto the ledger balance.
pub fn difference(
    ledger_balance: Milliunits,
    remote_balance: Milliunits,
) -> Result<Milliunits, SyncError> {
    ledger_balance.checked_sub(remote_balance).ok_or_else(|| {
        SyncError::OutOfRange(Decimal::from(ledger_balance.0) - Decimal::from(remote_balance.0))
    })
}

/// Bring the YNAB account `account_id` in line with the ledger, posting at most one
/// adjusting transaction dated `today`.
pub async fn sync_account(
    client: &ynab::Client,
    ledger: &Ledger,
    account_id: &str,
    settings: &SyncSettings,
    today: NaiveDate,
) -> Result<SyncOutcome> {
    let mut accounts = client
        .accounts(&settings.budget_id)
        .await
        .context("Failed to fetch YNAB accounts")?;
    let account = accounts
        .remove(account_id)
        .ok_or_else(|| SyncError::AccountNotFound(account_id.to_owned()))?;

    if account.on_budget {
        return Err(SyncError::NotTrackingAccount { name: account.name }.into());
    }
    if account.closed || account.deleted {
        tracing::warn!("YNAB account {:?} is closed or deleted", account.name);
    }

    let mapping = SyncMapping::from_note(account.note.as_deref())
        .with_context(|| format!("Invalid mapping in the note of {:?}", account.name))?;
    let target = match mapping {
        SyncMapping::Disabled => {
            tracing::info!("Syncing is disabled for {:?}", account.name);
            return Ok(SyncOutcome::Disabled);
        }
        SyncMapping::Enabled(target) => target,
    };

    let total = BalanceQuery::new(&target).execute(ledger)?;
    let ledger_balance = to_milliunits(total.number, settings.scale)?;
    let amount = difference(ledger_balance, account.balance)?;
    tracing::info!(
        "{:?}: ledger {} ({}), YNAB {}, difference {}",
        account.name,
        total,
        ledger_balance,
        account.balance,
        amount
    );

    if amount == Milliunits(0) && !settings.post_zero_difference {
        return Ok(SyncOutcome::InSync {
            balance: ledger_balance,
        });
    }

    let transaction = NewTransaction::adjustment(&account.id, today, amount);
    client
        .create_transaction(&settings.budget_id, &transaction)
        .await
        .context("Failed to create the adjustment transaction")?;

    Ok(SyncOutcome::Adjusted {
        ledger_balance,
        remote_balance: account.balance,
        amount,
    })
}
