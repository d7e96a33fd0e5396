use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use org_registry::api;
use org_registry::config::{config, RegistryConfig};
use org_registry::database::DatabaseManager;
use org_registry::registry::Registry;
use org_registry::shutdown::wait_for_shutdown_signal;
use org_registry::telemetry::{init_telemetry, shutdown_telemetry};
use org_registry::workflow::Actor;

#[derive(Parser)]
#[command(name = "org-registry")]
#[command(about = "Registration backend for the government organization portal")]
#[command(long_about = "Serves the organization registration API: officers submit organizations \
                       and services for review, admins approve, reject and promote them into the \
                       live registry. Start the API with 'org-registry serve'.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, help = "Override server.bind_addr from the configuration")]
        bind: Option<String>,
    },
    /// Apply database migrations and exit
    Migrate,
    /// Print how many organizations are waiting for review
    PendingCount,
    /// Show the effective configuration
    Config {
        /// Write the configuration to a file instead of printing it
        #[arg(long, help = "Save the effective configuration as TOML to this path")]
        save: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind } => {
            tokio::runtime::Runtime::new()?.block_on(async { serve_command(bind).await })
        }
        Commands::Migrate => {
            tokio::runtime::Runtime::new()?.block_on(async { migrate_command().await })
        }
        Commands::PendingCount => {
            tokio::runtime::Runtime::new()?.block_on(async { pending_count_command().await })
        }
        Commands::Config { save } => config_command(save),
    }
}

async fn serve_command(bind: Option<String>) -> Result<()> {
    let config = config()?;
    init_telemetry(&config.observability)?;

    let database = DatabaseManager::new(&config.database).await?;
    let registry = Arc::new(Registry::from_config(
        database.pool().clone(),
        &config.documents,
    ));
    let metrics = registry.metrics();

    let addr = bind.unwrap_or_else(|| config.server.bind_addr.clone());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Organization registry listening on {}", addr);

    axum::serve(listener, api::router(registry))
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;

    metrics.log_stats();
    database.shutdown().await;
    shutdown_telemetry();
    Ok(())
}

async fn migrate_command() -> Result<()> {
    let config = config()?;
    init_telemetry(&config.observability)?;

    let database = DatabaseManager::new(&config.database).await?;
    if !config.database.auto_migrate {
        database.migrate().await?;
    }
    database.shutdown().await;

    println!("✅ Database at {} is up to date", config.database.url);
    Ok(())
}

async fn pending_count_command() -> Result<()> {
    let config = config()?;
    init_telemetry(&config.observability)?;

    let database = DatabaseManager::new(&config.database).await?;
    let registry = Registry::new(database.pool().clone());
    let count = registry.pending_count(&Actor::admin("cli")).await?;
    database.shutdown().await;

    println!("{count}");
    Ok(())
}

fn config_command(save: Option<PathBuf>) -> Result<()> {
    let config: &RegistryConfig = config()?;

    match save {
        Some(path) => {
            config.save_to_file(&path)?;
            println!("✅ Configuration written to {}", path.display());
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}
