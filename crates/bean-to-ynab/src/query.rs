//! The balance query, `SELECT value(sum(position)) WHERE account ~ PATTERN`, restricted
//! to what a sync needs.

use crate::Decimal;
use crate::ledger::{BookedPosting, Ledger, is_under};
use crate::mapping::SyncTarget;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueryError {
    #[error(
        "balance is held in several currencies ({}) and no operating_currency option selects one",
        .0.join(", ")
    )]
    AmbiguousCurrency(Vec<String>),
    #[error("the value of {0} is out of range")]
    Overflow(String),
}

/// Total market value of the matching postings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub number: Decimal,
    /// `None` if no posting matched.
    pub currency: Option<String>,
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.currency {
            Some(currency) => write!(f, "{} {}", self.number, currency),
            None => write!(f, "{}", self.number),
        }
    }
}

pub struct BalanceQuery<'a> {
    target: &'a SyncTarget,
}

impl<'a> BalanceQuery<'a> {
    pub fn new(target: &'a SyncTarget) -> Self {
        BalanceQuery { target }
    }

    pub fn matches(&self, account: &str) -> bool {
        if let Some(excluded) = &self.target.excluded_subaccount
            && is_under(account, excluded)
        {
            return false;
        }
        self.target.account_pattern.is_match(account)
    }

    pub fn execute(&self, ledger: &Ledger) -> Result<Balance, QueryError> {
        tracing::debug!("Running query: {}", self);

        let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut matched = 0usize;
        for posting in ledger.postings.iter().filter(|p| self.matches(&p.account)) {
            let overflow = || QueryError::Overflow(posting.account.clone());
            let (number, currency) = value(ledger, posting).ok_or_else(overflow)?;
            let total = totals.entry(currency).or_default();
            *total = total.checked_add(number).ok_or_else(overflow)?;
            matched += 1;
        }
        totals.retain(|_, number| !number.is_zero());

        if matched == 0 {
            tracing::warn!(
                "No postings match `{}`, using a balance of zero",
                self.target.account_pattern
            );
        }

        let mut currencies = totals.into_iter();
        match (currencies.next(), currencies.len()) {
            (None, _) => Ok(Balance {
                number: Decimal::ZERO,
                currency: None,
            }),
            (Some((currency, number)), 0) => Ok(Balance {
                number,
                currency: Some(currency),
            }),
            (Some(first), _) => {
                let totals: BTreeMap<_, _> = std::iter::once(first).chain(currencies).collect();
                let operating = ledger
                    .options
                    .operating_currencies
                    .iter()
                    .find(|currency| totals.contains_key(*currency));
                let Some(currency) = operating else {
                    return Err(QueryError::AmbiguousCurrency(totals.into_keys().collect()));
                };
                for (other, number) in totals.iter().filter(|(other, _)| *other != currency) {
                    tracing::warn!("Ignoring {number} {other} held besides {currency}");
                }
                Ok(Balance {
                    number: totals[currency],
                    currency: Some(currency.clone()),
                })
            }
        }
    }
}

/// Market value of a posting: positions held at cost are converted to the cost currency
/// at the latest known price, everything else stays as is.
fn value(ledger: &Ledger, posting: &BookedPosting) -> Option<(Decimal, String)> {
    if let Some(cost) = &posting.cost
        && let Some(price) = ledger.prices.latest(&posting.currency, &cost.currency)
    {
        return Some((posting.units.checked_mul(price)?, cost.currency.clone()));
    }
    Some((posting.units, posting.currency.clone()))
}

impl fmt::Display for BalanceQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SELECT value(sum(position)) WHERE account ~ {:?}",
            self.target.account_pattern.as_str()
        )?;
        if let Some(excluded) = &self.target.excluded_subaccount {
            write!(f, " AND NOT account ~ \"^{excluded}(:|$)\"")?;
        }
        Ok(())
    }
}
