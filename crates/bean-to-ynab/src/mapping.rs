//! The sync mapping stored in the note of a YNAB account.
//!
//! A note looks like this:
//!
//! ```text
//! enabled: true
//! ledger-account-pattern: Assets:Tracking:Pension
//! excluded-subaccount: Assets:Tracking:Pension:Employer
//! ```
//!
//! The keys `bean-to-ynab`, `bean` and `bean-x` are accepted as older spellings.

use regex::Regex;
use std::collections::HashMap;
use std::str::FromStr;

const KEY_ENABLED: &str = "enabled";
const KEY_PATTERN: &str = "ledger-account-pattern";
const KEY_EXCLUDED: &str = "excluded-subaccount";

#[derive(Debug, Clone)]
pub enum SyncMapping {
    Disabled,
    Enabled(SyncTarget),
}

/// Which ledger postings make up the balance of the YNAB account.
#[derive(Debug, Clone)]
pub struct SyncTarget {
    pub account_pattern: Regex,
    pub excluded_subaccount: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("no mapping configured: the account note is empty")]
    NoMapping,
    #[error("line {line}: expected `key: value`, found {content:?}")]
    MalformedLine { line: usize, content: String },
    #[error("line {line}: key `{key}` is given more than once")]
    DuplicateKey { line: usize, key: &'static str },
    #[error("`enabled` must be `true` or `false`, found {0:?}")]
    InvalidFlag(String),
    #[error("sync is enabled but `ledger-account-pattern` is missing")]
    MissingPattern,
    #[error("`ledger-account-pattern` is not a valid regular expression: {0}")]
    InvalidPattern(String),
    #[error("`excluded-subaccount` is not a valid account name: {0:?}")]
    InvalidAccount(String),
}

impl SyncMapping {
    /// Parse the note of a YNAB account. An absent note is an error just like an empty one.
    pub fn from_note(note: Option<&str>) -> Result<Self, MappingError> {
        note.unwrap_or_default().parse()
    }
}

impl FromStr for SyncMapping {
    type Err = MappingError;

    fn from_str(note: &str) -> Result<Self, Self::Err> {
        if note.trim().is_empty() {
            return Err(MappingError::NoMapping);
        }

        let mut values: HashMap<&'static str, &str> = HashMap::new();
        for (index, content) in note.lines().enumerate() {
            let line = index + 1;
            if content.trim().is_empty() {
                continue;
            }
            let Some((key, value)) = content.split_once(": ") else {
                return Err(MappingError::MalformedLine {
                    line,
                    content: content.to_owned(),
                });
            };
            let Some(key) = canonical_key(key.trim()) else {
                tracing::warn!("Ignoring unknown mapping key {:?}", key.trim());
                continue;
            };
            if values.insert(key, value.trim()).is_some() {
                return Err(MappingError::DuplicateKey { line, key });
            }
        }

        let enabled = match values.get(KEY_ENABLED) {
            None => false,
            Some(flag) if flag.eq_ignore_ascii_case("true") => true,
            Some(flag) if flag.eq_ignore_ascii_case("false") => false,
            Some(flag) => return Err(MappingError::InvalidFlag(flag.to_string())),
        };
        if !enabled {
            return Ok(SyncMapping::Disabled);
        }

        let pattern = values
            .get(KEY_PATTERN)
            .filter(|pattern| !pattern.is_empty())
            .ok_or(MappingError::MissingPattern)?;
        let account_pattern =
            Regex::new(pattern).map_err(|error| MappingError::InvalidPattern(error.to_string()))?;

        let excluded_subaccount = match values.get(KEY_EXCLUDED) {
            None | Some(&"") => None,
            Some(account) => {
                account
                    .parse::<beancount_parser::Account>()
                    .map_err(|_| MappingError::InvalidAccount(account.to_string()))?;
                Some(account.to_string())
            }
        };

        Ok(SyncMapping::Enabled(SyncTarget {
            account_pattern,
            excluded_subaccount,
        }))
    }
}

fn canonical_key(key: &str) -> Option<&'static str> {
    match key {
        KEY_ENABLED | "bean-to-ynab" => Some(KEY_ENABLED),
        KEY_PATTERN | "bean" => Some(KEY_PATTERN),
        KEY_EXCLUDED | "bean-x" => Some(KEY_EXCLUDED),
        _ => None,
    }
}
