//! Live tests against a running Redis.
//!
//! Run with `REDIS_URL=redis://127.0.0.1:6379 cargo test -p ratesync-cache -- --ignored`.
//! Each test works under its own key prefix so runs do not interfere.

use ratesync_cache::RedisCache;

async fn live_cache() -> RedisCache {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    RedisCache::connect(&url).await.expect("redis must be reachable")
}

async fn seed(prefix: &str, count: usize) {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let client = redis::Client::open(url).expect("client");
    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .expect("connection");
    for i in 0..count {
        let _: () = redis::cmd("SET")
            .arg(format!("{prefix}{i}"))
            .arg("cached")
            .query_async(&mut conn)
            .await
            .expect("SET");
    }
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn ping_succeeds() {
    live_cache().await.ping().await.expect("ping");
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn delete_matching_removes_only_matching_keys() {
    let cache = live_cache().await;
    seed("ratesync-test:a:vendors:list:", 250).await;
    seed("ratesync-test:a:vendors:detail:", 3).await;

    let deleted = cache
        .delete_matching("ratesync-test:a:vendors:list:*")
        .await
        .expect("delete_matching");
    assert_eq!(deleted, 250);

    let untouched = cache
        .delete_matching("ratesync-test:a:vendors:detail:*")
        .await
        .expect("cleanup");
    assert_eq!(untouched, 3);
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn delete_matching_is_idempotent() {
    let cache = live_cache().await;
    seed("ratesync-test:b:vendors:list:", 5).await;

    let first = cache
        .delete_matching("ratesync-test:b:vendors:list:*")
        .await
        .expect("first pass");
    let second = cache
        .delete_matching("ratesync-test:b:vendors:list:*")
        .await
        .expect("second pass");

    assert_eq!(first, 5);
    assert_eq!(second, 0);
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn delete_matching_with_no_matches_is_ok() {
    let cache = live_cache().await;
    let deleted = cache
        .delete_matching("ratesync-test:c:nothing-here:*")
        .await
        .expect("zero matches is not an error");
    assert_eq!(deleted, 0);
}
