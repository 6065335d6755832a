//! Fixed-window limiter backed by Redis.
//!
//! The first call for a key in a window sets the key's TTL; the counter then
//! expires on its own. Increment and expiry run as one server-side script,
//! and a counter found without a TTL gets one on its next hit. Any store
//! problem hands the call to the local limiter.

use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::Script;
use tokio::sync::Mutex;

use super::local::LocalWindowLimiter;
use super::WINDOW;
use crate::observability::metrics;

/// Upper bound on connecting to, or talking with, the store.
const STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// `INCR` the window counter and make sure it expires.
/// KEYS[1] = counter key, ARGV[1] = TTL in seconds.
const INCREMENT_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 or redis.call('TTL', KEYS[1]) == -1 then
  redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
";

/// Lifecycle of the lazily created store connection.
enum StoreState {
    Pending,
    Connected(ConnectionManager),
    /// Connecting failed once; never retried for the life of the process.
    Failed,
}

pub struct SharedWindowLimiter {
    limit: i64,
    url: String,
    prefix: String,
    state: Mutex<StoreState>,
    script: Script,
    fallback: Arc<LocalWindowLimiter>,
}

impl SharedWindowLimiter {
    pub fn new(
        requests_per_minute: u32,
        url: impl Into<String>,
        prefix: impl Into<String>,
        fallback: Arc<LocalWindowLimiter>,
    ) -> Self {
        Self {
            limit: i64::from(requests_per_minute),
            url: url.into(),
            prefix: prefix.into(),
            state: Mutex::new(StoreState::Pending),
            script: Script::new(INCREMENT_SCRIPT),
            fallback,
        }
    }

    fn key_for(&self, identity: &str) -> String {
        format!("{}:{}", self.prefix, identity)
    }

    pub async fn admit(&self, identity: &str) -> bool {
        let Some(mut conn) = self.connection().await else {
            metrics::record_rate_limit_fallback();
            return self.fallback.admit(identity);
        };

        let key = self.key_for(identity);
        match tokio::time::timeout(STORE_TIMEOUT, increment(&self.script, &mut conn, &key)).await {
            Ok(Ok(count)) => count <= self.limit,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Rate limit store error, using local limiter");
                metrics::record_rate_limit_fallback();
                self.fallback.admit(identity)
            }
            Err(_) => {
                tracing::warn!("Rate limit store timed out, using local limiter");
                metrics::record_rate_limit_fallback();
                self.fallback.admit(identity)
            }
        }
    }

    /// Return the shared connection, creating it on first use.
    ///
    /// The state lock is held across the connect so concurrent first callers
    /// wait for a single attempt instead of racing to open their own.
    async fn connection(&self) -> Option<ConnectionManager> {
        let mut state = self.state.lock().await;
        match &*state {
            StoreState::Connected(conn) => return Some(conn.clone()),
            StoreState::Failed => return None,
            StoreState::Pending => {}
        }

        match tokio::time::timeout(STORE_TIMEOUT, connect(&self.url)).await {
            Ok(Ok(conn)) => {
                tracing::info!("Connected to shared rate limit store");
                *state = StoreState::Connected(conn.clone());
                Some(conn)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Shared rate limit store unavailable, falling back to local limiter");
                *state = StoreState::Failed;
                None
            }
            Err(_) => {
                tracing::warn!("Shared rate limit store connect timed out, falling back to local limiter");
                *state = StoreState::Failed;
                None
            }
        }
    }
}

async fn connect(url: &str) -> redis::RedisResult<ConnectionManager> {
    let client = redis::Client::open(url)?;
    client.get_connection_manager().await
}

async fn increment(
    script: &Script,
    conn: &mut ConnectionManager,
    key: &str,
) -> redis::RedisResult<i64> {
    let ttl = WINDOW.as_secs() + 1;
    let count: i64 = script.key(key).arg(ttl).invoke_async(conn).await?;
    Ok(count)
}
