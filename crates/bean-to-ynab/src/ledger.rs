//! Loading a beancount journal into a queryable [`Ledger`].
//!
//! Parsing is done by `beancount_parser`. On top of that the loader books every posting:
//! elided amounts are interpolated, reductions written as `{}` are matched against the
//! lots held, `pad` directives are expanded against the following `balance` assertion,
//! and the journal is checked for the usual structural problems (unopened or closed
//! accounts, unbalanced transactions, failing balance assertions).

use crate::prices::PriceMap;
use crate::{Decimal, Directive, DirectiveContent, Entry, Transaction};
use beancount_parser::{Date, PostingPrice};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Display;
use std::path::Path;

/// A single posting after booking, holding `units` of `currency`.
#[derive(Debug, Clone, PartialEq)]
pub struct BookedPosting {
    pub date: Date,
    pub account: String,
    pub units: Decimal,
    pub currency: String,
    pub cost: Option<UnitCost>,
}

/// Per-unit acquisition cost of a position.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitCost {
    pub number: Decimal,
    pub currency: String,
}

/// Global `option` values from the journal.
#[derive(Debug, Default, Clone)]
pub struct LedgerOptions {
    pub operating_currencies: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Ledger {
    pub directives: Vec<Directive>,
    pub postings: Vec<BookedPosting>,
    pub options: LedgerOptions,
    pub(crate) prices: PriceMap,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("{0}")]
    Read(String),
    #[error("plugin {0:?} is not supported")]
    UnsupportedPlugin(String),
    #[error("{date}: account {account} is opened twice")]
    DuplicateOpen { date: Date, account: String },
    #[error("{date}: account {account} is not open")]
    UnopenedAccount { date: Date, account: String },
    #[error("{date}: account {account} was closed on {closed}")]
    ClosedAccount {
        date: Date,
        account: String,
        closed: Date,
    },
    #[error("{date}: transaction {description:?} has more than one posting without an amount")]
    MultipleElided { date: Date, description: String },
    #[error("{date}: transaction {description:?} does not balance ({residual})")]
    Unbalanced {
        date: Date,
        description: String,
        residual: String,
    },
    #[error("{date}: no lot of {currency} in {account} to reduce")]
    NoMatchingLot {
        date: Date,
        account: String,
        currency: String,
    },
    #[error("{date}: {account} holds {currency} at several costs, the reduction needs an explicit cost")]
    AmbiguousLot {
        date: Date,
        account: String,
        currency: String,
    },
    #[error("{date}: cannot reduce {account} by {units} {currency}, only {held} held")]
    InsufficientLots {
        date: Date,
        account: String,
        currency: String,
        units: Decimal,
        held: Decimal,
    },
    #[error("{date}: amounts posted to {account} are out of range")]
    Overflow { date: Date, account: String },
    #[error("{date}: balance failed for {account}: expected {expected} {currency}, got {actual} {currency}")]
    BalanceFailed {
        date: Date,
        account: String,
        currency: String,
        expected: Decimal,
        actual: Decimal,
    },
}

/// Result of loading a journal. The ledger is only trustworthy when `errors` is empty.
#[derive(Debug)]
pub struct Loaded {
    pub ledger: Ledger,
    pub errors: Vec<LedgerError>,
}

#[derive(Debug, thiserror::Error)]
#[error("ledger has {} error(s), first: {}", .0.len(), .0[0])]
pub struct LoadErrors(pub Vec<LedgerError>);

impl Loaded {
    pub fn into_result(self) -> Result<Ledger, LoadErrors> {
        if self.errors.is_empty() {
            Ok(self.ledger)
        } else {
            Err(LoadErrors(self.errors))
        }
    }
}

/// Read the journal at `path`, following its `include`s.
pub fn load_file(path: impl AsRef<Path>) -> Loaded {
    let path = path.as_ref();
    tracing::debug!("Loading ledger from {}", path.display());
    let entries =
        beancount_parser::read_files_iter::<Decimal>(std::iter::once(path.to_owned()));
    build(entries)
}

pub fn load_source(source: &str) -> Loaded {
    build(beancount_parser::parse_iter::<Decimal>(source))
}

impl Ledger {
    pub fn from_source(source: &str) -> Result<Self, LoadErrors> {
        load_source(source).into_result()
    }
}

const AUTO_ACCOUNTS: &str = "beancount.plugins.auto_accounts";
const IMPLICIT_PRICES: &str = "beancount.plugins.implicit_prices";

/// Standard plugins that only report problems and never change what is booked.
const VALIDATION_PLUGINS: &[&str] = &[
    "beancount.plugins.check_commodity",
    "beancount.plugins.coherent_cost",
    "beancount.plugins.leafonly",
    "beancount.plugins.noduplicates",
    "beancount.plugins.nounused",
    "beancount.plugins.onecommodity",
    "beancount.plugins.sellgains",
    "beancount.plugins.unique_prices",
];

/// Plugins declared by the journal that change booking.
#[derive(Debug, Default, Clone, Copy)]
struct Plugins {
    /// Open accounts on first use.
    auto_accounts: bool,
    /// Record a price for every posting with a price or cost annotation.
    implicit_prices: bool,
}

fn build<E: Display>(entries: impl IntoIterator<Item = Result<Entry, E>>) -> Loaded {
    let mut errors = Vec::new();
    let mut options = LedgerOptions::default();
    let mut plugins = Plugins::default();
    let mut directives = Vec::new();

    for entry in entries {
        match entry {
            Ok(Entry::Directive(directive)) => directives.push(directive),
            Ok(Entry::Option(option)) => {
                if &*option.name == "operating_currency" {
                    options.operating_currencies.push(option.value.to_string());
                }
            }
            Ok(Entry::Plugin(plugin)) => match &*plugin.name {
                AUTO_ACCOUNTS => plugins.auto_accounts = true,
                IMPLICIT_PRICES => plugins.implicit_prices = true,
                name if VALIDATION_PLUGINS.contains(&name) => {
                    tracing::debug!("Skipping validation plugin {name}")
                }
                name => errors.push(LedgerError::UnsupportedPlugin(name.to_owned())),
            },
            Ok(_) => {}
            Err(error) => errors.push(LedgerError::Read(error.to_string())),
        }
    }

    crate::sorting::sort_directives(&mut directives);

    let mut booker = Booker {
        plugins,
        ..Booker::default()
    };
    for directive in &directives {
        booker.process(directive);
    }
    errors.extend(booker.errors);

    Loaded {
        ledger: Ledger {
            directives,
            postings: booker.postings,
            options,
            prices: booker.prices,
        },
        errors,
    }
}

struct PendingPad {
    date: Date,
    source: String,
    padded: HashSet<String>,
}

#[derive(Debug)]
struct Lot {
    units: Decimal,
    cost: UnitCost,
}

#[derive(Default)]
struct Booker {
    plugins: Plugins,
    open: HashMap<String, Option<Date>>,
    auto_opened: HashSet<String>,
    pads: HashMap<String, PendingPad>,
    /// Lots held at cost, by account and currency.
    lots: HashMap<(String, String), Vec<Lot>>,
    postings: Vec<BookedPosting>,
    prices: PriceMap,
    errors: Vec<LedgerError>,
}

impl Booker {
    fn process(&mut self, directive: &Directive) {
        let date = directive.date;
        match &directive.content {
            DirectiveContent::Open(open) => {
                let account = open.account.to_string();
                let reopened = self.open.insert(account.clone(), None).is_some();
                if reopened && !self.auto_opened.remove(&account) {
                    self.errors.push(LedgerError::DuplicateOpen { date, account });
                }
            }
            DirectiveContent::Close(close) => {
                let account = close.account.to_string();
                match self.open.get_mut(&account) {
                    Some(closed) => *closed = Some(date),
                    None => self.errors.push(LedgerError::UnopenedAccount { date, account }),
                }
            }
            DirectiveContent::Price(price) => self.prices.insert(
                date,
                price.currency.to_string(),
                price.amount.currency.to_string(),
                price.amount.value,
            ),
            DirectiveContent::Pad(pad) => {
                let account = pad.account.to_string();
                let source = pad.source_account.to_string();
                self.check_open(date, &account);
                self.check_open(date, &source);
                self.pads.insert(
                    account,
                    PendingPad {
                        date,
                        source,
                        padded: HashSet::new(),
                    },
                );
            }
            DirectiveContent::Balance(balance) => {
                let account = balance.account.to_string();
                self.check_open(date, &account);
                if let Err(error) = self.check_balance(
                    date,
                    account,
                    balance.amount.currency.to_string(),
                    balance.amount.value,
                    balance.tolerance,
                ) {
                    self.errors.push(error);
                }
            }
            DirectiveContent::Transaction(transaction) => self.book_transaction(date, transaction),
            _ => {}
        }
    }

    fn check_open(&mut self, date: Date, account: &str) {
        match self.open.get(account).copied() {
            None if self.plugins.auto_accounts => {
                tracing::debug!("{date}: opening {account} on first use");
                self.open.insert(account.to_owned(), None);
                self.auto_opened.insert(account.to_owned());
            }
            None => self.errors.push(LedgerError::UnopenedAccount {
                date,
                account: account.to_owned(),
            }),
            Some(Some(closed)) if closed < date => self.errors.push(LedgerError::ClosedAccount {
                date,
                account: account.to_owned(),
                closed,
            }),
            Some(_) => {}
        }
    }

    fn book_transaction(&mut self, date: Date, transaction: &Transaction) {
        let description = transaction
            .narration
            .clone()
            .or_else(|| transaction.payee.clone())
            .unwrap_or_default();

        let mut residual = Residual::default();
        let mut elided = Vec::new();
        let mut booked = Vec::new();

        for posting in &transaction.postings {
            let account = posting.account.to_string();
            self.check_open(date, &account);

            let Some(amount) = &posting.amount else {
                elided.push(account);
                continue;
            };
            let units = amount.value;
            let currency = amount.currency.to_string();

            let cost = match &posting.cost {
                None => None,
                Some(cost) => {
                    let number = cost.amount.as_ref().map(|amount| UnitCost {
                        number: amount.value,
                        currency: amount.currency.to_string(),
                    });
                    match self.book_lot(date, &account, units, &currency, number) {
                        Ok(cost) => Some(cost),
                        Err(error) => {
                            self.errors.push(error);
                            continue;
                        }
                    }
                }
            };

            let price = posting.price.as_ref();
            if self.plugins.implicit_prices {
                self.record_implicit_price(date, &currency, units, cost.as_ref(), price);
            }

            let added = weight(units, &currency, cost.as_ref(), price)
                .and_then(|(currency, weight, scale)| residual.add(&currency, weight, scale));
            if added.is_none() {
                self.errors.push(LedgerError::Overflow { date, account });
                continue;
            }

            booked.push(BookedPosting {
                date,
                account,
                units,
                currency,
                cost,
            });
        }

        match elided.as_slice() {
            [] => {
                let unbalanced = residual.unbalanced();
                if !unbalanced.is_empty() {
                    self.errors.push(LedgerError::Unbalanced {
                        date,
                        description,
                        residual: unbalanced.join(", "),
                    });
                }
            }
            [account] => {
                for (currency, (sum, _)) in residual.sums {
                    if sum.is_zero() {
                        continue;
                    }
                    booked.push(BookedPosting {
                        date,
                        account: account.clone(),
                        units: -sum,
                        currency,
                        cost: None,
                    });
                }
            }
            _ => self
                .errors
                .push(LedgerError::MultipleElided { date, description }),
        }

        self.postings.extend(booked);
    }

    /// Book `units` of `currency` held at cost in `account`.
    ///
    /// Without a cost number the posting reduces the lots already held and takes their
    /// cost, which has to be the same for all of them.
    fn book_lot(
        &mut self,
        date: Date,
        account: &str,
        units: Decimal,
        currency: &str,
        cost: Option<UnitCost>,
    ) -> Result<UnitCost, LedgerError> {
        let lots = self
            .lots
            .entry((account.to_owned(), currency.to_owned()))
            .or_default();

        let reducing = cost.is_none();
        let cost = match cost {
            Some(cost) => cost,
            None => {
                let mut reducible = lots
                    .iter()
                    .filter(|lot| lot.units.is_sign_negative() != units.is_sign_negative());
                let Some(first) = reducible.next() else {
                    return Err(LedgerError::NoMatchingLot {
                        date,
                        account: account.to_owned(),
                        currency: currency.to_owned(),
                    });
                };
                if reducible.any(|lot| lot.cost != first.cost) {
                    return Err(LedgerError::AmbiguousLot {
                        date,
                        account: account.to_owned(),
                        currency: currency.to_owned(),
                    });
                }
                first.cost.clone()
            }
        };

        match lots.iter_mut().find(|lot| lot.cost == cost) {
            Some(lot) => {
                let remaining = lot.units.checked_add(units).ok_or_else(|| LedgerError::Overflow {
                    date,
                    account: account.to_owned(),
                })?;
                if reducing
                    && !remaining.is_zero()
                    && remaining.is_sign_negative() != lot.units.is_sign_negative()
                {
                    return Err(LedgerError::InsufficientLots {
                        date,
                        account: account.to_owned(),
                        currency: currency.to_owned(),
                        units,
                        held: lot.units,
                    });
                }
                lot.units = remaining;
            }
            None => lots.push(Lot {
                units,
                cost: cost.clone(),
            }),
        }
        lots.retain(|lot| !lot.units.is_zero());

        Ok(cost)
    }

    fn record_implicit_price(
        &mut self,
        date: Date,
        currency: &str,
        units: Decimal,
        cost: Option<&UnitCost>,
        price: Option<&PostingPrice<Decimal>>,
    ) {
        let (quote, rate) = match (price, cost) {
            (Some(PostingPrice::Unit(price)), _) => (price.currency.to_string(), price.value),
            (Some(PostingPrice::Total(price)), _) => {
                let Some(rate) = price.value.checked_div(units.abs()) else {
                    return;
                };
                (price.currency.to_string(), rate)
            }
            (None, Some(cost)) => (cost.currency.clone(), cost.number),
            (None, None) => return,
        };
        self.prices.insert(date, currency.to_owned(), quote, rate);
    }

    fn check_balance(
        &mut self,
        date: Date,
        account: String,
        currency: String,
        expected: Decimal,
        tolerance: Option<Decimal>,
    ) -> Result<(), LedgerError> {
        let overflow = |account: &str| LedgerError::Overflow {
            date,
            account: account.to_owned(),
        };
        let mut actual = self
            .balance_before(date, &account, &currency)
            .ok_or_else(|| overflow(&account))?;

        if let Some(pad) = self.pads.get_mut(&account)
            && pad.padded.insert(currency.clone())
        {
            let difference = expected
                .checked_sub(actual)
                .ok_or_else(|| overflow(&account))?;
            if !difference.is_zero() {
                tracing::debug!("{date}: padding {account} with {difference} {currency}");
                let pad_date = pad.date;
                let source = pad.source.clone();
                self.postings.push(BookedPosting {
                    date: pad_date,
                    account: account.clone(),
                    units: difference,
                    currency: currency.clone(),
                    cost: None,
                });
                self.postings.push(BookedPosting {
                    date: pad_date,
                    account: source,
                    units: -difference,
                    currency: currency.clone(),
                    cost: None,
                });
                actual = expected;
            }
        }

        let tolerance = tolerance.unwrap_or_else(|| inferred_tolerance(expected.scale()));
        let difference = expected
            .checked_sub(actual)
            .ok_or_else(|| overflow(&account))?;
        if difference.abs() > tolerance {
            return Err(LedgerError::BalanceFailed {
                date,
                account,
                currency,
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Units of `currency` held in `account` and its children at the start of `date`.
    fn balance_before(&self, date: Date, account: &str, currency: &str) -> Option<Decimal> {
        self.postings
            .iter()
            .filter(|posting| posting.date < date && posting.currency == currency)
            .filter(|posting| is_under(&posting.account, account))
            .try_fold(Decimal::ZERO, |sum, posting| sum.checked_add(posting.units))
    }
}

/// Currency, amount and precision a posting contributes to its transaction's balance.
fn weight(
    units: Decimal,
    currency: &str,
    cost: Option<&UnitCost>,
    price: Option<&PostingPrice<Decimal>>,
) -> Option<(String, Decimal, u32)> {
    match (cost, price) {
        (Some(cost), _) => Some((
            cost.currency.clone(),
            units.checked_mul(cost.number)?,
            cost.number.scale(),
        )),
        (None, Some(PostingPrice::Unit(price))) => Some((
            price.currency.to_string(),
            units.checked_mul(price.value)?,
            price.value.scale(),
        )),
        (None, Some(PostingPrice::Total(price))) => {
            let total = if units.is_sign_negative() {
                -price.value
            } else {
                price.value
            };
            Some((price.currency.to_string(), total, price.value.scale()))
        }
        (None, None) => Some((currency.to_owned(), units, units.scale())),
    }
}

/// Whether `account` is `parent` itself or one of its descendants.
pub fn is_under(account: &str, parent: &str) -> bool {
    account
        .strip_prefix(parent)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
}

const MAX_SCALE: u32 = 28;

/// Half of the last significant digit; amounts written as integers must match exactly.
fn inferred_tolerance(scale: u32) -> Decimal {
    if scale == 0 {
        Decimal::ZERO
    } else {
        Decimal::new(5, scale.saturating_add(1).min(MAX_SCALE))
    }
}

/// Per-currency weight sum of a transaction, with the coarsest precision seen.
#[derive(Default)]
struct Residual {
    sums: BTreeMap<String, (Decimal, u32)>,
}

impl Residual {
    fn add(&mut self, currency: &str, weight: Decimal, scale: u32) -> Option<()> {
        let (sum, min_scale) = self
            .sums
            .entry(currency.to_owned())
            .or_insert((Decimal::ZERO, u32::MAX));
        *sum = sum.checked_add(weight)?;
        *min_scale = (*min_scale).min(scale);
        Some(())
    }

    fn unbalanced(&self) -> Vec<String> {
        self.sums
            .iter()
            .filter(|(_, (sum, scale))| sum.abs() > inferred_tolerance(*scale))
            .map(|(currency, (sum, _))| format!("{sum} {currency}"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors(source: &str) -> String {
        load_source(source)
            .errors
            .iter()
            .map(|error| format!("{error}\n"))
            .collect()
    }

    fn units_of(ledger: &Ledger, account: &str) -> Vec<(Decimal, String)> {
        ledger
            .postings
            .iter()
            .filter(|posting| posting.account == account)
            .map(|posting| (posting.units, posting.currency.clone()))
            .collect()
    }

    #[test]
    fn interpolates_elided_amount() {
        let ledger = Ledger::from_source(
            r#"
2025-01-01 open Assets:Checking
2025-01-01 open Expenses:Food

2025-01-02 * "Market" "Groceries"
    Assets:Checking  -42.10 EUR
    Expenses:Food
"#,
        )
        .unwrap();

        assert_eq!(
            units_of(&ledger, "Expenses:Food"),
            vec![(Decimal::new(4210, 2), "EUR".to_owned())]
        );
    }

    #[test]
    fn interpolates_from_cost() {
        let ledger = Ledger::from_source(
            r#"
2025-01-01 open Assets:Brokerage:ETF
2025-01-01 open Assets:Brokerage:Cash

2025-01-02 * "Buy"
    Assets:Brokerage:ETF  10 ETF {101.50 EUR}
    Assets:Brokerage:Cash
"#,
        )
        .unwrap();

        assert_eq!(
            units_of(&ledger, "Assets:Brokerage:Cash"),
            vec![(Decimal::new(-101500, 2), "EUR".to_owned())]
        );
        let etf = &ledger.postings[0];
        assert_eq!(
            etf.cost,
            Some(UnitCost {
                number: Decimal::new(10150, 2),
                currency: "EUR".to_owned()
            })
        );
    }

    #[test]
    fn collects_options() {
        let ledger = Ledger::from_source(
            r#"
option "title" "Household"
option "operating_currency" "EUR"
option "operating_currency" "USD"
"#,
        )
        .unwrap();

        assert_eq!(ledger.options.operating_currencies, vec!["EUR", "USD"]);
    }

    #[test]
    fn reduction_takes_cost_of_held_lot() {
        let ledger = Ledger::from_source(
            r#"
2025-01-01 open Assets:Brokerage:ETF
2025-01-01 open Assets:Brokerage:Cash
2025-01-01 open Income:Gains

2025-01-02 * "Buy"
    Assets:Brokerage:ETF  10 ETF {100.00 EUR}
    Assets:Brokerage:Cash

2025-02-01 * "Buy more at the same cost"
    Assets:Brokerage:ETF  2 ETF {100.00 EUR}
    Assets:Brokerage:Cash

2025-03-01 * "Sell"
    Assets:Brokerage:ETF  -4 ETF {} @ 110.00 EUR
    Assets:Brokerage:Cash  440.00 EUR
    Income:Gains
"#,
        )
        .unwrap();

        let etf: Vec<_> = ledger
            .postings
            .iter()
            .filter(|posting| posting.account == "Assets:Brokerage:ETF")
            .map(|posting| (posting.units, posting.cost.clone()))
            .collect();
        let cost = Some(UnitCost {
            number: Decimal::new(10000, 2),
            currency: "EUR".to_owned(),
        });
        assert_eq!(
            etf,
            vec![
                (Decimal::new(10, 0), cost.clone()),
                (Decimal::new(2, 0), cost.clone()),
                (Decimal::new(-4, 0), cost),
            ]
        );
        assert_eq!(
            units_of(&ledger, "Income:Gains"),
            vec![(Decimal::new(-4000, 2), "EUR".to_owned())]
        );
    }

    #[test]
    fn lot_reduction_errors() {
        let source = r#"
2025-01-01 open Assets:Brokerage:ETF
2025-01-01 open Assets:Brokerage:Cash

2025-01-02 * "Buy"
    Assets:Brokerage:ETF  10 ETF {100.00 EUR}
    Assets:Brokerage:Cash

2025-01-03 * "Sell too much"
    Assets:Brokerage:ETF  -11 ETF {}
    Assets:Brokerage:Cash

2025-01-04 * "Buy again"
    Assets:Brokerage:ETF  5 ETF {120.00 EUR}
    Assets:Brokerage:Cash

2025-01-05 * "Sell unspecified lot"
    Assets:Brokerage:ETF  -1 ETF {}
    Assets:Brokerage:Cash

2025-01-06 * "Sell something never bought"
    Assets:Brokerage:ETF  -1 BOND {}
    Assets:Brokerage:Cash
"#;
        insta::assert_snapshot!(errors(source), @r#"
        2025-01-03: cannot reduce Assets:Brokerage:ETF by -11 ETF, only 10 held
        2025-01-05: Assets:Brokerage:ETF holds ETF at several costs, the reduction needs an explicit cost
        2025-01-06: no lot of BOND in Assets:Brokerage:ETF to reduce
        "#);
    }

    #[test]
    fn auto_accounts_plugin_opens_on_first_use() {
        let source = r#"
plugin "beancount.plugins.auto_accounts"

2025-01-01 open Assets:Checking

2025-01-02 * "Groceries"
    Assets:Checking  -42.10 EUR
    Expenses:Food
"#;
        assert_eq!(errors(source), "");
        assert_eq!(
            errors(source.replace("plugin \"beancount.plugins.auto_accounts\"", "").as_str()),
            "2025-01-02: account Expenses:Food is not open\n"
        );
    }

    #[test]
    fn implicit_prices_plugin_records_prices() {
        let ledger = Ledger::from_source(
            r#"
plugin "beancount.plugins.implicit_prices"

2025-01-01 open Assets:Brokerage:ETF
2025-01-01 open Assets:Brokerage:Cash
2025-01-01 open Assets:Wallet

2025-01-02 * "Buy"
    Assets:Brokerage:ETF  10 ETF {100.00 EUR}
    Assets:Brokerage:Cash

2025-01-03 * "Exchange"
    Assets:Wallet  -20.00 USD @@ 18.00 EUR
    Assets:Wallet

2025-02-01 * "Buy later"
    Assets:Brokerage:ETF  1 ETF {104.00 EUR} @ 104.00 EUR
    Assets:Brokerage:Cash
"#,
        )
        .unwrap();

        assert_eq!(
            ledger.prices.latest("ETF", "EUR"),
            Some(Decimal::new(10400, 2))
        );
        assert_eq!(ledger.prices.latest("USD", "EUR"), Some(Decimal::new(9, 1)));
    }

    #[test]
    fn unknown_plugins_are_rejected() {
        let source = r#"
plugin "beancount.plugins.noduplicates"
plugin "beancount_reds_plugins.capital_gains_classifier.long_short"
"#;
        insta::assert_snapshot!(errors(source), @r#"plugin "beancount_reds_plugins.capital_gains_classifier.long_short" is not supported"#);
    }

    #[test]
    fn extreme_amounts_do_not_panic() {
        let tiny = r#"
2025-01-01 open Assets:Dust
2025-01-01 open Income:Dust

2025-01-02 * "Dust"
    Assets:Dust  0.0000000000000000000000000001 EUR
    Income:Dust  -0.0000000000000000000000000001 EUR

2025-01-03 balance Assets:Dust  0.0000000000000000000000000001 EUR
"#;
        assert_eq!(errors(tiny), "");

        let huge = r#"
2025-01-01 open Assets:Vault
2025-01-01 open Income:Vault

2025-01-02 * "Huge"
    Assets:Vault  79228162514264337593543950335 EUR
    Assets:Vault  79228162514264337593543950335 EUR
    Income:Vault
"#;
        insta::assert_snapshot!(errors(huge), @"2025-01-02: amounts posted to Assets:Vault are out of range");
    }

    #[test]
    fn pad_fills_up_to_balance() {
        let ledger = Ledger::from_source(
            r#"
2025-01-01 open Assets:Tracking:Pension
2025-01-01 open Equity:Opening-Balances

2025-01-01 pad Assets:Tracking:Pension Equity:Opening-Balances
2025-01-02 balance Assets:Tracking:Pension  1500.00 EUR
"#,
        )
        .unwrap();

        assert_eq!(
            units_of(&ledger, "Assets:Tracking:Pension"),
            vec![(Decimal::new(150000, 2), "EUR".to_owned())]
        );
        assert_eq!(
            units_of(&ledger, "Equity:Opening-Balances"),
            vec![(Decimal::new(-150000, 2), "EUR".to_owned())]
        );
    }

    #[test]
    fn balance_assertion_includes_children() {
        let source = r#"
2025-01-01 open Assets:Bank
2025-01-01 open Assets:Bank:Checking
2025-01-01 open Income:Salary

2025-01-02 * "Salary"
    Assets:Bank:Checking  1000.00 EUR
    Income:Salary

2025-01-03 balance Assets:Bank  1000.00 EUR
"#;
        assert_eq!(errors(source), "");
    }

    #[test]
    fn reports_structural_errors() {
        let source = r#"
2025-01-01 open Assets:Checking
2025-01-01 open Assets:Checking
2025-01-01 open Expenses:Food
2025-01-05 close Expenses:Food

2025-01-02 * "Unknown account"
    Assets:Checking  -10.00 EUR
    Expenses:Unknown

2025-01-03 * "Unbalanced"
    Assets:Checking  -10.00 EUR
    Expenses:Food     9.00 EUR

2025-01-04 * "Two elided"
    Assets:Checking
    Expenses:Food

2025-01-06 * "After close"
    Assets:Checking  -1.00 EUR
    Expenses:Food

2025-01-07 balance Assets:Checking  0.00 EUR
"#;
        insta::assert_snapshot!(errors(source), @r#"
        2025-01-01: account Assets:Checking is opened twice
        2025-01-02: account Expenses:Unknown is not open
        2025-01-03: transaction "Unbalanced" does not balance (-1.00 EUR)
        2025-01-04: transaction "Two elided" has more than one posting without an amount
        2025-01-06: account Expenses:Food was closed on 2025-01-05
        2025-01-07: balance failed for Assets:Checking: expected 0.00 EUR, got -21.00 EUR
        "#);
    }

    #[test]
    fn parse_errors_are_reported() {
        let loaded = load_source("2025-01-01 this is not beancount\n");
        assert!(matches!(loaded.errors.first(), Some(LedgerError::Read(_))));
        assert!(loaded.into_result().is_err());
    }

    #[test]
    fn account_hierarchy() {
        assert!(is_under("Assets:Tracking:Foo", "Assets:Tracking"));
        assert!(is_under("Assets:Tracking", "Assets:Tracking"));
        assert!(!is_under("Assets:TrackingOther", "Assets:Tracking"));
        assert!(!is_under("Assets", "Assets:Tracking"));
    }
}
