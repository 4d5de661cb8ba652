mod ratings;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::ratings::RatingsCommands;

#[derive(Debug, Parser)]
#[command(name = "ratesync-cli")]
#[command(about = "Vendor rating maintenance commands")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// One-off rating runs and lookups
    Ratings {
        #[command(subcommand)]
        command: RatingsCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("ratesync-cli: no command given; see --help");
        return Ok(());
    };

    let config = ratesync_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool_config = ratesync_db::PoolConfig::from_app_config(&config);
    let pool = ratesync_db::connect_pool(&config.database_url, pool_config).await?;

    let result = match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => ratesync_db::health_check(&pool)
            .await
            .map(|()| println!("database: ok"))
            .map_err(anyhow::Error::from),
        Commands::Db {
            command: DbCommands::Migrate,
        } => ratesync_db::run_migrations(&pool)
            .await
            .map(|applied| println!("applied {applied} migration(s)"))
            .map_err(anyhow::Error::from),
        Commands::Ratings {
            command: RatingsCommands::Run { vendor },
        } => ratings::run_ratings(&config, &pool, &vendor).await,
        Commands::Ratings {
            command: RatingsCommands::Show { vendor_id },
        } => ratings::show_rating(&pool, &vendor_id).await,
    };

    pool.close().await;
    result
}
