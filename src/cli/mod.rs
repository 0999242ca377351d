use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::content;
use crate::database::{DatabaseManager, MemoryStore, PgStore, Store};
use crate::notify;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "portfolio-api")]
#[command(about = "Portfolio and course catalogue backend")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides PORT)")]
        port: Option<u16>,

        #[arg(long, help = "Keep all data in memory instead of PostgreSQL")]
        memory: bool,
    },

    #[command(about = "Create the database schema and exit")]
    Migrate,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!("Starting in {:?} mode", config.environment);

    match cli.command.unwrap_or(Commands::Serve {
        port: None,
        memory: false,
    }) {
        Commands::Serve { port, memory } => serve(config, port, memory).await,
        Commands::Migrate => {
            connect(&config).await?;
            tracing::info!("Schema is up to date");
            Ok(())
        }
    }
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgStore> {
    let url = config.database_url()?;
    let pool = DatabaseManager::connect(url, &config.database)
        .await
        .context("failed to connect to the database")?;
    DatabaseManager::migrate(&pool, &content::tables())
        .await
        .context("failed to create the database schema")?;
    Ok(PgStore::new(pool))
}

async fn serve(mut config: AppConfig, port: Option<u16>, memory: bool) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }

    let store: Arc<dyn Store> = if memory {
        tracing::warn!("Using the in-memory store; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(connect(&config).await?)
    };

    tokio::fs::create_dir_all(&config.uploads.dir)
        .await
        .with_context(|| format!("failed to create {}", config.uploads.dir.display()))?;

    let notifier = notify::from_config(config.notify.webhook_url.as_deref());
    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let app = crate::app(AppState::new(config, store, notifier));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
