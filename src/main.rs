use clap::Parser;
use portfolio_api::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present so local runs pick up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Err(e) = portfolio_api::cli::run(cli).await {
        tracing::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
