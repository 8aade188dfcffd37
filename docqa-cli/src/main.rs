use clap::Parser;
use docqa_cli::{AppConfig, Cli, app, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging();

    let config = AppConfig::from_cli(&cli)?;
    app::run(config).await
}
