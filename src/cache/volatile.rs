//! Fault-tolerant handle to the volatile key-value store.
//!
//! The [`VolatileStore`] trait converts every transport failure into an
//! availability signal: `get` yields a typed [`StoreUnavailable`] instead
//! of an error the caller must catch, and `set` reports plain success or
//! failure. The coordinator treats "unavailable" exactly like a miss, so
//! a Redis outage degrades resolution instead of breaking it.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::RedisConfig;
use crate::error::{Result, VitiError};

/// The store could not be reached or the command failed in transit.
///
/// Deliberately carries no detail: callers only branch on availability,
/// and the underlying error is logged at the point of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("volatile store unavailable")]
pub struct StoreUnavailable;

/// Get/set-with-expiry access to a shared volatile store.
#[async_trait]
pub trait VolatileStore: Send + Sync {
    /// Fetch a value. `Ok(None)` is a miss; `Err` means the store itself
    /// could not answer.
    async fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, StoreUnavailable>;

    /// Store a value with a TTL. Returns `false` on any failure; never
    /// raises.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> bool;

    /// Liveness probe for the operational surface.
    async fn is_available(&self) -> bool;
}

/// Redis-backed [`VolatileStore`] over a lazily established multiplexed
/// connection.
///
/// The connection is created on first use and cached; any command failure
/// discards it so the next call re-probes. A past outage therefore never
/// locks out recovery.
pub struct RedisStore {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl RedisStore {
    /// Build a store handle. Does not touch the network; connection is
    /// deferred to the first command.
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url())
            .map_err(|e| VitiError::Config(format!("Invalid Redis configuration: {e}")))?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
            connect_timeout: config.connect_timeout,
            command_timeout: config.command_timeout,
        })
    }

    /// Get the cached connection or establish a new one.
    async fn connection(&self) -> Option<MultiplexedConnection> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Some(conn.clone());
        }
        match tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(Ok(conn)) => {
                debug!("Connected to Redis");
                *guard = Some(conn.clone());
                Some(conn)
            }
            Ok(Err(e)) => {
                warn!("Redis connection failed: {e}");
                None
            }
            Err(_) => {
                warn!("Redis connection timed out");
                None
            }
        }
    }

    /// Drop the cached connection so the next command re-probes.
    async fn invalidate(&self) {
        *self.conn.lock().await = None;
    }
}

#[async_trait]
impl VolatileStore for RedisStore {
    async fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, StoreUnavailable> {
        let Some(mut conn) = self.connection().await else {
            return Err(StoreUnavailable);
        };
        let result: std::result::Result<redis::RedisResult<Option<Vec<u8>>>, _> =
            tokio::time::timeout(self.command_timeout, conn.get(key)).await;
        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(key, "Redis GET failed: {e}");
                self.invalidate().await;
                Err(StoreUnavailable)
            }
            Err(_) => {
                warn!(key, "Redis GET timed out");
                self.invalidate().await;
                Err(StoreUnavailable)
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        let result: std::result::Result<redis::RedisResult<()>, _> = tokio::time::timeout(
            self.command_timeout,
            conn.set_ex(key, value, ttl.as_secs()),
        )
        .await;
        match result {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(key, "Redis SETEX failed: {e}");
                self.invalidate().await;
                false
            }
            Err(_) => {
                warn!(key, "Redis SETEX timed out");
                self.invalidate().await;
                false
            }
        }
    }

    async fn is_available(&self) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        let result: std::result::Result<redis::RedisResult<String>, _> =
            tokio::time::timeout(self.command_timeout, async {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await;
        match result {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!("Redis PING failed: {e}");
                self.invalidate().await;
                false
            }
            Err(_) => {
                warn!("Redis PING timed out");
                self.invalidate().await;
                false
            }
        }
    }
}
