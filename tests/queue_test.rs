use std::collections::BTreeMap;

use chrono::{FixedOffset, TimeZone};
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::Pool;
use svc_util::queue::{Payload, RedisQueue};

/// Helper: pool for tests.
/// Requires REDIS_URL env var or defaults to local dev.
fn test_pool() -> Pool {
    let url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379/0".to_string());
    deadpool_redis::Config::from_url(url)
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .unwrap()
}

async fn clear(pool: &Pool, queues: &[&str]) {
    let mut conn = pool.get().await.unwrap();
    for queue in queues {
        let _: i64 = conn.del(*queue).await.unwrap();
        let _: i64 = conn.del(format!("{}-uniq", queue)).await.unwrap();
    }
}

async fn list_len(pool: &Pool, queue: &str) -> i64 {
    let mut conn = pool.get().await.unwrap();
    conn.llen(queue).await.unwrap()
}

async fn is_pending(pool: &Pool, queue: &str, key: &str) -> bool {
    let mut conn = pool.get().await.unwrap();
    conn.sismember(format!("{}-uniq", queue), key).await.unwrap()
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn push_deduplicates_by_key() {
    let pool = test_pool();
    clear(&pool, &["svcutil_dedup"]).await;

    let q = RedisQueue::with_pool(pool.clone(), vec!["svcutil_dedup".to_string()]).unwrap();
    q.push("v", Some("k"), None).await.unwrap();
    q.push("v2", Some("k"), None).await.unwrap();

    assert_eq!(list_len(&pool, "svcutil_dedup").await, 1);
    assert!(is_pending(&pool, "svcutil_dedup", "k").await);
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn string_values_are_their_own_key() {
    let pool = test_pool();
    clear(&pool, &["svcutil_selfkey"]).await;

    let q = RedisQueue::with_pool(pool.clone(), vec!["svcutil_selfkey".to_string()]).unwrap();
    q.push("value", None, None).await.unwrap();
    q.push("value", None, None).await.unwrap();

    assert_eq!(list_len(&pool, "svcutil_selfkey").await, 1);
    assert!(is_pending(&pool, "svcutil_selfkey", "value").await);
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn same_key_is_tracked_per_queue() {
    let pool = test_pool();
    clear(&pool, &["svcutil_iso_a", "svcutil_iso_b"]).await;

    let mut q = RedisQueue::with_pool(
        pool.clone(),
        vec!["svcutil_iso_a".to_string(), "svcutil_iso_b".to_string()],
    )
    .unwrap()
    .pop_timeout(1.0);

    q.push("va", Some("k"), Some("svcutil_iso_a")).await.unwrap();
    q.push("vb", Some("k"), Some("svcutil_iso_b")).await.unwrap();

    // Consuming from one queue must not free the key on the other.
    let popped = q.pop().await.unwrap().unwrap();
    assert_eq!(popped, ("svcutil_iso_a".to_string(), Payload::from("va")));
    assert!(!is_pending(&pool, "svcutil_iso_a", "k").await);
    assert!(is_pending(&pool, "svcutil_iso_b", "k").await);
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn unscoped_pop_releases_key_immediately() {
    let pool = test_pool();
    clear(&pool, &["svcutil_plain"]).await;

    let mut q = RedisQueue::with_pool(pool.clone(), vec!["svcutil_plain".to_string()])
        .unwrap()
        .pop_timeout(1.0);

    q.push("v", Some("k"), None).await.unwrap();
    let popped = q.pop().await.unwrap().unwrap();

    assert_eq!(popped, ("svcutil_plain".to_string(), Payload::from("v")));
    assert!(!is_pending(&pool, "svcutil_plain", "k").await);

    // The key was freed, so an identical push goes through again.
    q.push("v3", Some("k"), None).await.unwrap();
    assert_eq!(list_len(&pool, "svcutil_plain").await, 1);
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn scoped_pop_releases_on_finish() {
    let pool = test_pool();
    clear(&pool, &["svcutil_scope_ok"]).await;

    let mut q = RedisQueue::with_pool(pool.clone(), vec!["svcutil_scope_ok".to_string()])
        .unwrap()
        .pop_timeout(1.0);
    q.push("v", Some("k"), None).await.unwrap();

    let mut scope = q.scope();
    let popped = scope.pop().await.unwrap().unwrap();
    assert_eq!(popped.1, Payload::from("v"));

    // Claimed, not yet released.
    assert!(is_pending(&pool, "svcutil_scope_ok", "k").await);

    scope.finish().await.unwrap();
    assert!(!is_pending(&pool, "svcutil_scope_ok", "k").await);
}

async fn consume_and_fail(q: &mut RedisQueue) -> anyhow::Result<()> {
    let mut scope = q.scope();
    let _item = scope.pop().await?;
    anyhow::bail!("worker exploded mid-item");
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn scoped_pop_releases_when_the_scope_unwinds() {
    let pool = test_pool();
    clear(&pool, &["svcutil_scope_err"]).await;

    let mut q = RedisQueue::with_pool(pool.clone(), vec!["svcutil_scope_err".to_string()])
        .unwrap()
        .pop_timeout(1.0);
    q.push("v", Some("k"), None).await.unwrap();

    assert!(consume_and_fail(&mut q).await.is_err());

    // The guard releases in the background; give it a moment to land.
    tokio::time::sleep(tokio::time::Duration::from_millis(250)).await;
    assert!(!is_pending(&pool, "svcutil_scope_err", "k").await);
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn scope_without_a_pop_releases_nothing() {
    let pool = test_pool();
    clear(&pool, &["svcutil_scope_idle"]).await;

    let mut q = RedisQueue::with_pool(pool.clone(), vec!["svcutil_scope_idle".to_string()])
        .unwrap()
        .pop_timeout(1.0);
    q.push("v", Some("k"), None).await.unwrap();

    let scope = q.scope();
    scope.finish().await.unwrap();

    assert!(is_pending(&pool, "svcutil_scope_idle", "k").await);
    assert_eq!(list_len(&pool, "svcutil_scope_idle").await, 1);
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn pop_times_out_with_empty_result() {
    let pool = test_pool();
    clear(&pool, &["svcutil_empty"]).await;

    let mut q = RedisQueue::with_pool(pool.clone(), vec!["svcutil_empty".to_string()])
        .unwrap()
        .pop_timeout(1.0);

    assert_eq!(q.pop().await.unwrap(), None);
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn scoped_pop_timeout_leaves_nothing_claimed() {
    let pool = test_pool();
    clear(&pool, &["svcutil_scope_empty"]).await;

    let mut q = RedisQueue::with_pool(pool.clone(), vec!["svcutil_scope_empty".to_string()])
        .unwrap()
        .pop_timeout(1.0);

    let mut scope = q.scope();
    assert_eq!(scope.pop().await.unwrap(), None);
    scope.finish().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn update_pushes_each_value_once() {
    let pool = test_pool();
    clear(&pool, &["svcutil_update"]).await;

    let q = RedisQueue::with_pool(pool.clone(), vec!["svcutil_update".to_string()]).unwrap();
    q.update(["value", "value2", "value"], None).await.unwrap();

    assert_eq!(list_len(&pool, "svcutil_update").await, 2);
    assert!(is_pending(&pool, "svcutil_update", "value").await);
    assert!(is_pending(&pool, "svcutil_update", "value2").await);
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn structured_payloads_round_trip_through_the_queue() {
    let pool = test_pool();
    clear(&pool, &["svcutil_codec"]).await;

    let close_time = FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2020, 8, 12, 11, 42, 25)
        .unwrap();
    let mut trade = BTreeMap::new();
    trade.insert("asset".to_string(), Payload::from("GBPUSD"));
    trade.insert("close_price".to_string(), Payload::Decimal("1.30561".parse().unwrap()));
    trade.insert("close_time".to_string(), Payload::DateTime(close_time));
    trade.insert("pnl_pips".to_string(), Payload::Decimal("-1.5".parse().unwrap()));
    trade.insert("risking".to_string(), Payload::Null);
    trade.insert("ticket".to_string(), Payload::Int(55301005));
    trade.insert("volume".to_string(), Payload::Float(0.05));
    let payload = Payload::Object(trade);

    let mut q = RedisQueue::with_pool(pool.clone(), vec!["svcutil_codec".to_string()])
        .unwrap()
        .pop_timeout(1.0);
    q.push(payload.clone(), Some("ticket-55301005"), None).await.unwrap();

    let (queue, value) = q.pop().await.unwrap().unwrap();
    assert_eq!(queue, "svcutil_codec");
    assert_eq!(value, payload);
}
