mod api;
mod middleware;
mod scheduler;
#[cfg(test)]
mod test_support;

use std::{sync::Arc, time::Duration};

use ratesync_cache::RedisCache;
use ratesync_engine::LiveScheduler;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, health_router, ratings, HealthState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = ratesync_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting ratesync-server");

    let pool_config = ratesync_db::PoolConfig::from_app_config(&config);
    let pool = ratesync_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = ratesync_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations complete");

    let cache = RedisCache::connect(&config.redis_url).await?;

    let scheduler = scheduler::build_scheduler(&config, pool.clone(), cache.clone()).await?;

    let auth = AuthState::new(
        &config.api_keys,
        matches!(config.env, ratesync_core::Environment::Development),
    )?;
    let app = build_app(
        health_router(HealthState {
            pool: pool.clone(),
            cache,
        }),
        ratings::router(Arc::clone(&scheduler)),
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(bind_addr = %config.bind_addr, "listening");

    if config.scheduler_autostart {
        scheduler::spawn_boot_start(
            Arc::clone(&scheduler),
            Duration::from_secs(config.scheduler_boot_delay_secs),
        );
    } else {
        tracing::info!("scheduler: autostart disabled; start it through the admin API");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(scheduler))
        .await?;

    pool.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal(scheduler: Arc<LiveScheduler>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping scheduler before graceful shutdown");
    if let Err(e) = scheduler.shutdown().await {
        tracing::error!(error = %e, "scheduler: shutdown failed");
    }
}
