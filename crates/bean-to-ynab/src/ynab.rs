//! Minimal client for the parts of the YNAB API a sync needs.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_BASE_URL: &str = "https://api.youneedabudget.com/v1";
/// Budget id YNAB resolves to the budget the token's owner used last.
pub const LAST_USED_BUDGET: &str = "last-used";

pub const ADJUSTMENT_PAYEE: &str = "Automatic Balance Adjustment";
pub const ADJUSTMENT_MEMO: &str = "Automatic Balance Adjustment by Beancount";

/// YNAB's integer amount representation, a thousandth of the currency unit.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Milliunits(pub i64);

impl Milliunits {
    pub fn checked_sub(self, rhs: Milliunits) -> Option<Milliunits> {
        self.0.checked_sub(rhs.0).map(Milliunits)
    }
}

impl fmt::Display for Milliunits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub on_budget: bool,
    pub balance: Milliunits,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearedStatus {
    Cleared,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTransaction {
    pub account_id: String,
    pub date: NaiveDate,
    pub amount: Milliunits,
    pub payee_name: String,
    pub memo: String,
    pub cleared: ClearedStatus,
    pub approved: bool,
}

impl NewTransaction {
    /// A cleared and approved transaction moving the account balance by `amount`.
    pub fn adjustment(account_id: &str, date: NaiveDate, amount: Milliunits) -> Self {
        NewTransaction {
            account_id: account_id.to_owned(),
            date,
            amount,
            payee_name: ADJUSTMENT_PAYEE.to_owned(),
            memo: ADJUSTMENT_MEMO.to_owned(),
            cleared: ClearedStatus::Cleared,
            approved: true,
        }
    }
}

#[derive(Deserialize)]
struct AccountsResponse {
    data: AccountsData,
}

#[derive(Deserialize)]
struct AccountsData {
    accounts: Vec<Account>,
}

#[derive(Serialize)]
struct SaveTransactionRequest<'a> {
    transaction: &'a NewTransaction,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    name: String,
    detail: String,
}

/// A non-success response from the YNAB API.
#[derive(Debug, thiserror::Error)]
#[error("YNAB API request failed with {status}{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: Option<String>,
}

pub struct Client {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl Client {
    pub fn new(token: impl Into<String>) -> Self {
        Client {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            token: token.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// All accounts of a budget, keyed by account id.
    pub async fn accounts(&self, budget_id: &str) -> Result<HashMap<String, Account>> {
        let url = format!("{}/budgets/{}/accounts", self.base_url, budget_id);
        tracing::debug!("GET {url}");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("Failed to request {url}"))?;
        let response: AccountsResponse = check(response)
            .await?
            .json()
            .await
            .context("Failed to parse YNAB accounts")?;

        Ok(response
            .data
            .accounts
            .into_iter()
            .map(|account| (account.id.clone(), account))
            .collect())
    }

    pub async fn create_transaction(
        &self,
        budget_id: &str,
        transaction: &NewTransaction,
    ) -> Result<()> {
        let url = format!("{}/budgets/{}/transactions", self.base_url, budget_id);
        tracing::debug!("POST {url}: {} milliunits", transaction.amount);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&SaveTransactionRequest { transaction })
            .send()
            .await
            .with_context(|| format!("Failed to request {url}"))?;
        check(response).await?;

        Ok(())
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .map(|response| format!("{} ({})", response.error.detail, response.error.name));
    Err(ApiError { status, detail })
}
