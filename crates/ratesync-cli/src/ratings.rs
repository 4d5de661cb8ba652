//! Rating command handlers for the CLI.
//!
//! Called from `main` once the pool and config are established. Runs here
//! bypass the server's scheduler entirely and are not recorded in its run
//! history.

use clap::Subcommand;
use ratesync_cache::RedisCache;
use ratesync_core::AppConfig;
use sqlx::PgPool;

/// Sub-commands available under `ratings`.
#[derive(Debug, Subcommand)]
pub enum RatingsCommands {
    /// Recompute ratings now and invalidate the vendor listing caches
    Run {
        /// Restrict the run to this vendor id (repeatable)
        #[arg(long)]
        vendor: Vec<String>,
    },
    /// Print the stored rating for a vendor
    Show {
        vendor_id: String,
    },
}

/// Run the rating pipeline once and print the summary as JSON.
///
/// With no `vendors` every live vendor is recomputed; otherwise only the
/// given ids. Per-vendor failures land in the summary rather than failing
/// the command.
///
/// # Errors
///
/// Returns an error if the cache connection or review client cannot be
/// established, or the summary cannot be serialised.
pub(crate) async fn run_ratings(
    config: &AppConfig,
    pool: &PgPool,
    vendors: &[String],
) -> anyhow::Result<()> {
    let cache = RedisCache::connect(&config.redis_url).await?;
    let pipeline = ratesync_engine::live_pipeline(config, pool.clone(), cache)?;

    let summary = if vendors.is_empty() {
        let summary = pipeline.run_for_all_vendors().await;
        pipeline.invalidate_vendor_list_caches().await;
        summary
    } else {
        pipeline.run_for_vendors(vendors).await
    };

    if let Some(error) = &summary.error {
        tracing::error!(error = %error, "ratings: run aborted");
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// # Errors
///
/// Returns an error if the query fails or no live vendor has this id.
pub(crate) async fn show_rating(pool: &PgPool, vendor_id: &str) -> anyhow::Result<()> {
    let row = ratesync_db::get_vendor_rating(pool, vendor_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("vendor '{vendor_id}' not found"))?;

    let updated = row
        .rating_updated_at
        .map_or_else(|| "never".to_string(), |at| at.to_rfc3339());
    println!("{}\t{}\t{updated}", row.vendor_id, row.rating);
    Ok(())
}
