//! Redis access for the distributed listing cache.
//!
//! Only two operations are needed here: a liveness ping for health checks and
//! pattern-based bulk invalidation of cached vendor listings.

use redis::aio::ConnectionManager;
use redis::Client;
use thiserror::Error;

/// Key pattern covering every cached vendor listing page.
pub const VENDOR_LIST_PATTERN: &str = "vendors:list:*";

/// Keys requested per `SCAN` page.
const SCAN_COUNT: u32 = 100;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("refusing to invalidate with pattern {0:?}")]
    InvalidPattern(String),
}

/// Shared handle to the cache. Cloning is cheap; all clones reuse the same
/// reconnecting multiplexed connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Opens a managed connection to `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Redis`] if the URL is malformed or the server is
    /// unreachable.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("cache: connected to redis");
        Ok(Self { conn })
    }

    /// Sends `PING`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Redis`] if the server does not answer.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// Deletes every key matching `pattern` and returns how many were removed.
    ///
    /// Walks the keyspace with cursor-based `SCAN ... MATCH ... COUNT` and
    /// removes each page with `UNLINK`, so the server is never blocked by a
    /// full `KEYS` sweep. Keys that disappear between the scan and the unlink
    /// are simply not counted.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidPattern`] for an empty or match-everything
    /// pattern, or [`CacheError::Redis`] if any command fails.
    pub async fn delete_matching(&self, pattern: &str) -> Result<u64, CacheError> {
        validate_pattern(pattern)?;

        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let removed: u64 = redis::cmd("UNLINK")
                    .arg(&keys)
                    .query_async(&mut conn)
                    .await?;
                deleted += removed;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        tracing::debug!(pattern, deleted, "cache: pattern invalidated");
        Ok(deleted)
    }
}

/// Rejects patterns that would wipe unrelated keys.
///
/// # Errors
///
/// Returns [`CacheError::InvalidPattern`] if the pattern is blank or consists
/// only of wildcards.
pub fn validate_pattern(pattern: &str) -> Result<(), CacheError> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '*') {
        return Err(CacheError::InvalidPattern(pattern.to_string()));
    }
    Ok(())
}
