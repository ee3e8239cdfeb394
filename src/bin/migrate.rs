use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use stockbook_api::{config, db, migrator::Migrator};

#[derive(Parser)]
#[command(name = "migrate", about = "Stockbook schema migration tool", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations
    Up {
        /// Apply at most this many pending migrations
        #[arg(long)]
        steps: Option<u32>,
    },
    /// Roll back applied migrations
    Down {
        /// Roll back this many migrations
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Drop all tables and reapply every migration
    Fresh,
    /// Show the status of every known migration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;

    match cli.command {
        Commands::Up { steps } => {
            Migrator::up(&pool, steps).await?;
            info!("Migrations applied");
        }
        Commands::Down { steps } => {
            Migrator::down(&pool, Some(steps)).await?;
            info!("Rolled back {} migration(s)", steps);
        }
        Commands::Fresh => {
            Migrator::fresh(&pool).await?;
            info!("Schema recreated from scratch");
        }
        Commands::Status => {
            Migrator::status(&pool).await?;
        }
    }

    db::close_pool(pool).await?;
    Ok(())
}
