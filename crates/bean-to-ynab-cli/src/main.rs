#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    bean_to_ynab_cli::run(std::env::args()).await
}
