//! Keep YNAB tracking accounts in sync with the balances of a beancount ledger.

pub mod ledger;
pub mod mapping;
mod prices;
pub mod query;
mod sorting;
pub mod sync;
pub mod ynab;

pub type Directive = beancount_parser::Directive<Decimal>;
pub type Entry = beancount_parser::Entry<Decimal>;
pub type DirectiveContent = beancount_parser::DirectiveContent<Decimal>;
pub type Transaction = beancount_parser::Transaction<Decimal>;
pub type Posting = beancount_parser::Posting<Decimal>;
pub type Decimal = rust_decimal::Decimal;

pub use anyhow::Result;
pub use ledger::Ledger;
