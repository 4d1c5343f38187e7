use crate::Decimal;
use beancount_parser::Date;
use std::collections::{BTreeMap, HashMap};

/// Prices declared with `price` directives, by `(base, quote)` currency pair.
#[derive(Debug, Default)]
pub struct PriceMap {
    pairs: HashMap<(String, String), BTreeMap<Date, Decimal>>,
}

impl PriceMap {
    pub fn insert(&mut self, date: Date, base: String, quote: String, rate: Decimal) {
        self.pairs
            .entry((base, quote))
            .or_default()
            .insert(date, rate);
    }

    /// Most recent price of one unit of `base` expressed in `quote`.
    ///
    /// Falls back to the inverse of the latest `quote`/`base` price.
    pub fn latest(&self, base: &str, quote: &str) -> Option<Decimal> {
        if base == quote {
            return Some(Decimal::ONE);
        }
        if let Some((_, rate)) = self.lookup(base, quote) {
            return Some(*rate);
        }
        let (_, inverse) = self.lookup(quote, base)?;
        Decimal::ONE.checked_div(*inverse)
    }

    fn lookup(&self, base: &str, quote: &str) -> Option<(&Date, &Decimal)> {
        self.pairs
            .get(&(base.to_owned(), quote.to_owned()))
            .and_then(|rates| rates.last_key_value())
    }
}
