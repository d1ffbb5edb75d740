use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    ragline::cli::run_cli().await
}
