use std::ops::{Deref, DerefMut};

use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Connection, Pool};

use super::codec::{self, Payload};
use crate::config::RedisConfig;
use crate::error::{Error, Result};

const DEDUP_SUFFIX: &str = "-uniq";
const DEFAULT_POP_TIMEOUT_SECS: f64 = 30.0;

/// Deduplicating work queue over Redis.
///
/// Each named queue is a Redis list holding `[key, value]` pairs, with a
/// companion set (`<queue>-uniq`) of the keys currently pending or claimed.
/// A key is in the set if and only if an item with that key is waiting in
/// the list or has been popped but not yet released, so pushing a key that
/// is already tracked is a silent no-op.
///
/// The handle services an ordered list of queues; `push` targets the primary
/// (first) queue unless told otherwise, `pop` blocks across all of them.
/// Claim state is per-handle: do not share one handle between consumers.
pub struct RedisQueue {
    pool: Pool,
    queue: String,
    queues: Vec<String>,
    pop_timeout: f64,
    scoped: bool,
    claim: Option<Claim>,
}

struct Claim {
    queue: String,
    key: String,
}

fn dedup_set(queue: &str) -> String {
    format!("{}{}", queue, DEDUP_SUFFIX)
}

impl RedisQueue {
    /// Connect a handle servicing the given queues, first name primary.
    ///
    /// Pool parameters come from the environment via [`RedisConfig`]. Queues
    /// and their dedup sets are created implicitly on first push; there is no
    /// provisioning step.
    pub async fn new(queues: Vec<String>) -> Result<Self> {
        let config = RedisConfig::from_env()?;
        let pool = config.create_pool()?;

        let service = Self::with_pool(pool, queues)?;

        // Test Redis connection
        let mut conn = service.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        tracing::info!("Queue '{}' initialized successfully", service.queue);

        Ok(service)
    }

    /// Build a handle over an existing pool.
    pub fn with_pool(pool: Pool, queues: Vec<String>) -> Result<Self> {
        let queue = queues
            .first()
            .cloned()
            .ok_or_else(|| Error::Queue("at least one queue name is required".to_string()))?;

        Ok(Self {
            pool,
            queue,
            queues,
            pop_timeout: DEFAULT_POP_TIMEOUT_SECS,
            scoped: false,
            claim: None,
        })
    }

    /// Override the blocking-pop timeout (seconds, default 30).
    pub fn pop_timeout(mut self, secs: f64) -> Self {
        self.pop_timeout = secs;
        self
    }

    /// Primary queue name.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// All queue names serviced by [`pop`](Self::pop), in listen order.
    pub fn queues(&self) -> &[String] {
        &self.queues
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn get_connection(&self) -> Result<Connection> {
        Ok(self.pool.get().await?)
    }

    /// Push a work item, deduplicated by `key`.
    ///
    /// `queue` defaults to the primary queue. `key` defaults to the value's
    /// own text: the raw string for string payloads, the encoded form for
    /// anything else. That default deduplicates structured payloads by their
    /// serialized representation, which is rarely a meaningful identity;
    /// callers should supply an explicit key for non-string values.
    ///
    /// If the key is already pending or claimed on that queue the push is a
    /// silent no-op. The membership check and the set/list writes are not
    /// wrapped in a store transaction: two producers racing the same new key
    /// can both observe "not present" and both append. Known limitation.
    pub async fn push<V: Into<Payload>>(
        &self,
        value: V,
        key: Option<&str>,
        queue: Option<&str>,
    ) -> Result<()> {
        let payload = value.into();
        let queue = queue.unwrap_or(&self.queue);

        let derived;
        let key = match key {
            Some(key) => key,
            None => {
                derived = match &payload {
                    Payload::String(s) => s.clone(),
                    other => codec::encode(other)?,
                };
                &derived
            }
        };

        let uniq = dedup_set(queue);
        let mut conn = self.get_connection().await?;

        let pending: bool = conn.sismember(&uniq, key).await?;
        if pending {
            tracing::debug!("Key '{}' already pending on queue '{}', skipping", key, queue);
            return Ok(());
        }

        conn.sadd::<_, _, ()>(&uniq, key).await?;

        let item = codec::encode_pair(key, &payload)?;
        if let Err(e) = conn.rpush::<_, _, i64>(queue, &item).await {
            // The append failed after the marker was set; pull the marker
            // back out so the key is not stranded with no list entry.
            let _: redis::RedisResult<i64> = conn.srem(&uniq, key).await;
            return Err(e.into());
        }

        tracing::debug!("Key '{}' pushed to queue '{}'", key, queue);
        Ok(())
    }

    /// Blocking-pop the oldest ready item across all serviced queues.
    ///
    /// Returns `Ok(None)` when the timeout elapses with nothing available;
    /// that is a normal result, not an error. On success returns the source
    /// queue name and the decoded value.
    ///
    /// Outside a scope the popped key is removed from the dedup set before
    /// returning, trusting the caller to have fully processed the item.
    /// Inside a [`scope`](Self::scope) the removal is deferred: the key is
    /// recorded as the handle's claim and released when the scope exits.
    pub async fn pop(&mut self) -> Result<Option<(String, Payload)>> {
        let mut conn = self.get_connection().await?;

        let reply: Option<(String, String)> = conn.blpop(&self.queues, self.pop_timeout).await?;
        let Some((queue, raw)) = reply else {
            return Ok(None);
        };

        let (key, value) = codec::decode_pair(&raw)?;

        if self.scoped {
            self.claim = Some(Claim { queue: queue.clone(), key });
        } else {
            conn.srem::<_, _, ()>(dedup_set(&queue), &key).await?;
        }

        Ok(Some((queue, value)))
    }

    /// Push each value in order, deduplicating by its own text.
    ///
    /// Equivalent to repeated [`push`](Self::push) calls with no key: the
    /// same per-item dedup semantics, no cross-item atomicity.
    pub async fn update<V, I>(&self, values: I, queue: Option<&str>) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<Payload>,
    {
        for value in values {
            self.push(value, None, queue).await?;
        }
        Ok(())
    }

    /// Enter scoped (claim/release) mode.
    ///
    /// While the returned guard lives, a successful pop records its
    /// `(queue, key)` as the handle's claim instead of removing the key from
    /// the dedup set. The claim is released when the guard goes away:
    /// explicitly via [`ScopedQueue::finish`], or on any other exit path by
    /// the guard's destructor. A consumer that dies inside the scope without
    /// unwinding leaves the key marked pending, so the dedup marker is never
    /// silently lost even though the list entry is gone.
    pub fn scope(&mut self) -> ScopedQueue<'_> {
        self.scoped = true;
        self.claim = None;
        ScopedQueue { queue: self }
    }

    async fn release(&mut self) -> Result<()> {
        if let Some(claim) = self.claim.take() {
            let mut conn = self.get_connection().await?;
            conn.srem::<_, _, ()>(dedup_set(&claim.queue), &claim.key).await?;
        }
        Ok(())
    }
}

/// Guard for a scoped acquisition on a [`RedisQueue`].
///
/// Derefs to the handle, so `push`/`pop`/`update` are all available inside
/// the scope. Dropping the guard releases any outstanding claim and disarms
/// the handle, whatever path control took out of the scope.
pub struct ScopedQueue<'a> {
    queue: &'a mut RedisQueue,
}

impl ScopedQueue<'_> {
    /// Pop with deferred release; see [`RedisQueue::pop`].
    ///
    /// A second pop inside one scope replaces the recorded claim without
    /// releasing the first key: the handle tracks at most one in-flight
    /// item, and a replaced key stays marked pending.
    pub async fn pop(&mut self) -> Result<Option<(String, Payload)>> {
        self.queue.pop().await
    }

    /// Exit the scope, awaiting the release of any outstanding claim.
    ///
    /// Prefer this over dropping the guard when the caller needs the dedup
    /// set settled before its next operation; the destructor can only spawn
    /// the removal in the background.
    pub async fn finish(self) -> Result<()> {
        let released = self.queue.release().await;
        self.queue.scoped = false;
        released
    }
}

impl Deref for ScopedQueue<'_> {
    type Target = RedisQueue;

    fn deref(&self) -> &RedisQueue {
        self.queue
    }
}

impl DerefMut for ScopedQueue<'_> {
    fn deref_mut(&mut self) -> &mut RedisQueue {
        self.queue
    }
}

impl Drop for ScopedQueue<'_> {
    fn drop(&mut self) {
        self.queue.scoped = false;

        if let Some(claim) = self.queue.claim.take() {
            let pool = self.queue.pool.clone();

            // Best-effort release when the scope exits without an explicit
            // finish (early return, `?`, panic unwind). Needs a running
            // Tokio runtime; without one the key stays claimed, same as a
            // process crash.
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        let released: Result<()> = async {
                            let mut conn = pool.get().await?;
                            conn.srem::<_, _, ()>(dedup_set(&claim.queue), &claim.key).await?;
                            Ok(())
                        }
                        .await;

                        if let Err(e) = released {
                            tracing::error!(
                                "Failed to release claim '{}' on queue '{}': {}",
                                claim.key,
                                claim.queue,
                                e
                            );
                        }
                    });
                }
                Err(_) => {
                    tracing::error!(
                        "No runtime to release claim '{}' on queue '{}'; key stays pending",
                        claim.key,
                        claim.queue
                    );
                }
            }
        }
    }
}
