mod config;
mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bean_to_ynab::ledger::{self, LoadErrors};
use bean_to_ynab::sync::{SyncOutcome, sync_account};
use bean_to_ynab::ynab;
use clap::{CommandFactory as _, Parser};

use config::Config;

#[derive(Parser)]
#[command(
    name = "bean-to-ynab",
    about = "Sync beancount account balances to YNAB tracking accounts"
)]
struct Args {
    /// Path to the beancount file. Defaults to `ledger` from bean-to-ynab.toml.
    ledger: Option<PathBuf>,

    /// YNAB personal access token
    #[arg(long)]
    ynab_token: String,

    /// Id of the YNAB account to sync
    #[arg(long)]
    account_id: String,
}

pub async fn run(args: impl IntoIterator<Item = String>) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bean_to_ynab=info,bean_to_ynab_cli=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    clap_complete::CompleteEnv::with_factory(Args::command).complete();

    let args = Args::parse_from(args);
    let (base_dir, config) = Config::find_and_load()?.unwrap_or_default();

    let outcome = sync(&args, &base_dir, &config).await?;
    report::print_outcome(&args.account_id, &outcome, config.sync.scale);

    Ok(())
}

async fn sync(args: &Args, base_dir: &Path, config: &Config) -> Result<SyncOutcome> {
    let ledger_path = args
        .ledger
        .clone()
        .or_else(|| config.ledger.as_ref().map(|ledger| base_dir.join(ledger)))
        .context("No ledger file given and no `ledger` set in bean-to-ynab.toml")?;

    // the ledger has to be sound before YNAB is contacted at all
    let loaded = ledger::load_file(&ledger_path);
    if !loaded.errors.is_empty() {
        for error in &loaded.errors {
            tracing::error!("{error}");
        }
        return Err(LoadErrors(loaded.errors))
            .with_context(|| format!("Failed to load {}", ledger_path.display()));
    }
    let ledger = loaded.ledger;
    tracing::debug!(
        "Loaded {} directives from {}",
        ledger.directives.len(),
        ledger_path.display()
    );

    let client =
        ynab::Client::new(args.ynab_token.clone()).with_base_url(config.ynab.base_url.clone());
    let settings = config.sync_settings();
    let today = chrono::Local::now().date_naive();

    sync_account(&client, &ledger, &args.account_id, &settings, today).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::State, routing::get};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    const MAPPING: &str = "enabled: true\nledger-account-pattern: Assets:Tracking:Pension";

    /// YNAB stand-in that records every request path.
    async fn start_ynab(requests: Arc<Mutex<Vec<String>>>) -> String {
        async fn accounts(State(requests): State<Arc<Mutex<Vec<String>>>>) -> Json<Value> {
            requests.lock().unwrap().push("GET accounts".to_owned());
            Json(json!({"data": {"accounts": [{
                "id": "pension",
                "name": "Pension",
                "on_budget": false,
                "balance": 1000000,
                "note": MAPPING,
            }]}}))
        }
        async fn transactions(State(requests): State<Arc<Mutex<Vec<String>>>>) -> Json<Value> {
            requests.lock().unwrap().push("POST transactions".to_owned());
            Json(json!({"data": {"transaction_ids": ["t-1"]}}))
        }

        let app = Router::new()
            .route("/v1/budgets/{budget_id}/accounts", get(accounts))
            .route(
                "/v1/budgets/{budget_id}/transactions",
                axum::routing::post(transactions),
            )
            .with_state(requests);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{address}/v1")
    }

    fn write_ledger(name: &str, source: &str) -> PathBuf {
        let temp_dir =
            std::env::temp_dir().join(format!("bean-to-ynab-cli-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&temp_dir).unwrap();
        std::fs::write(temp_dir.join("main.beancount"), source).unwrap();
        temp_dir
    }

    fn setup(base_url: &str) -> (Args, Config) {
        let args = Args::parse_from([
            "bean-to-ynab",
            "--ynab-token",
            "token",
            "--account-id",
            "pension",
        ]);
        let config: Config = toml::from_str(&format!(
            "ledger = \"main.beancount\"\n\n[ynab]\nbase_url = \"{base_url}\"\n"
        ))
        .unwrap();
        (args, config)
    }

    #[tokio::test]
    async fn broken_ledger_stops_before_contacting_ynab() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let base_url = start_ynab(requests.clone()).await;
        let base_dir = write_ledger(
            "broken",
            "2025-01-01 open Assets:Tracking:Pension\n\n2025-01-02 * \"Deposit\"\n    Assets:Tracking:Pension  100.00 EUR\n    Assets:Checking  -90.00 EUR\n",
        );
        let (args, config) = setup(&base_url);

        let error = sync(&args, &base_dir, &config).await.unwrap_err();

        let LoadErrors(errors) = error.downcast_ref::<LoadErrors>().expect("ledger errors");
        assert_eq!(errors.len(), 2);
        assert!(requests.lock().unwrap().is_empty());

        let _ = std::fs::remove_dir_all(&base_dir);
    }

    #[tokio::test]
    async fn sound_ledger_is_synced() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let base_url = start_ynab(requests.clone()).await;
        let base_dir = write_ledger(
            "sound",
            "2025-01-01 open Assets:Tracking:Pension\n2025-01-01 open Assets:Checking\n\n2025-01-02 * \"Deposit\"\n    Assets:Tracking:Pension  1002.50 EUR\n    Assets:Checking\n",
        );
        let (args, config) = setup(&base_url);

        let outcome = sync(&args, &base_dir, &config).await.unwrap();

        assert!(matches!(
            outcome,
            SyncOutcome::Adjusted {
                amount: ynab::Milliunits(2500),
                ..
            }
        ));
        assert_eq!(
            *requests.lock().unwrap(),
            vec!["GET accounts", "POST transactions"]
        );

        let _ = std::fs::remove_dir_all(&base_dir);
    }
}
