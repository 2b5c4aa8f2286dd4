//! sqlweave-migrate CLI
//!
//! Command-line tool for the migrations bookkeeping table.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use sqlweave_migrate::prelude::*;

/// Reversible Postgres migrations.
#[derive(Parser)]
#[command(name = "sqlweave-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string.
    #[arg(short, long, env = "DATABASE_URL")]
    database: String,

    /// JSON config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Versions table name (overrides the config file).
    #[arg(long)]
    migrations_table: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the migrated-versions table.
    Init,

    /// List applied versions.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &cli.config {
        Some(path) => MigrationConfig::from_file(path)?,
        None => MigrationConfig::default(),
    };
    if let Some(table) = cli.migrations_table {
        config = config.migrations_table(table);
    }

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cli.database)
        .await?;
    let adapter = PgAdapter::new(pool);

    match cli.command {
        Commands::Init => {
            info!(table = %config.migrations_table, "Creating migrations table");
            create_migrations_table(&adapter, &config).await?;
            info!("Migrations table ready.");
        }

        Commands::Status => match get_migrated_versions_map(&adapter, &config).await {
            Ok(versions) if versions.is_empty() => {
                info!("No migrations have been applied yet.");
            }
            Ok(versions) => {
                println!("\nApplied migrations:");
                println!("{:-<60}", "");
                for version in &versions {
                    println!(" [X] {version}");
                }
                println!();
            }
            Err(MigrateError::NoMigrationsTable(table)) => {
                warn!("Migrations table '{table}' does not exist, run `init` first.");
            }
            Err(err) => return Err(err.into()),
        },
    }

    Ok(())
}
