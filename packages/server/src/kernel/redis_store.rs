//! Redis-backed key-value store.
//!
//! Single connection manager shared by all requests. Conditional writes run
//! as Lua scripts so the compare and the write execute as one Redis command;
//! the counter update is a MULTI/EXEC pipeline.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client, Script};
use tracing::debug;

use super::{with_deadline, BaseKeyValueStore, StoreError};

// KEYS[1] = key, ARGV[1] = expected, ARGV[2] = replacement, ARGV[3] = ttl (ms)
const COMPARE_AND_SET: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2], 'PX', ARGV[3])
    return 1
end
return 0
"#;

// KEYS[1] = key, ARGV[1] = expected
const COMPARE_AND_DELETE: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    compare_and_set: Script,
    compare_and_delete: Script,
}

impl RedisStore {
    /// Connect and build the shared connection manager.
    pub async fn connect(redis_url: &str, connect_deadline: Duration) -> Result<Self, StoreError> {
        let config = ConnectionManagerConfig::new().set_number_of_retries(1);

        let client = Client::open(redis_url)?;
        let conn = with_deadline(
            connect_deadline,
            client.get_connection_manager_with_config(config),
        )
        .await?;
        debug!("Redis connection manager ready");

        Ok(Self {
            conn,
            compare_and_set: Script::new(COMPARE_AND_SET),
            compare_and_delete: Script::new(COMPARE_AND_DELETE),
        })
    }
}

/// Redis rejects PX 0, so round sub-millisecond TTLs up.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl BaseKeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.pset_ex(key, value, ttl_millis(ttl)).await?;
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let swapped: i64 = self
            .compare_and_set
            .key(key)
            .arg(expected)
            .arg(value)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await?;
        Ok(swapped == 1)
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = self
            .compare_and_delete
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted == 1)
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        let ttl_ms = i64::try_from(ttl_millis(ttl)).unwrap_or(i64::MAX);
        let (count, _): (i64, i64) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .pexpire(key, ttl_ms)
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_millis_never_zero() {
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::from_secs(60)), 60_000);
    }
}
