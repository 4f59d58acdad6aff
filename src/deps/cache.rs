//! Redis cache connection
//!
//! The multiplexed connection is opened on first use and reused afterwards.
//! A command that does not complete, whether it failed or was cancelled by a
//! timeout, drops it so the next probe reconnects.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::RedisError;
use std::sync::{Mutex, MutexGuard};

use crate::health::{Probe, ProbeError};
use crate::lifecycle::{ReleaseError, Releasable};

pub struct Cache {
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl Cache {
    /// Parse the URL; does not connect.
    pub fn open(url: &str) -> Result<Self, RedisError> {
        Ok(Self {
            client: redis::Client::open(url)?,
            connection: Mutex::new(None),
        })
    }

    fn slot(&self) -> MutexGuard<'_, Option<MultiplexedConnection>> {
        self.connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn connection(&self) -> Result<MultiplexedConnection, RedisError> {
        let cached = self.slot().clone();
        if let Some(conn) = cached {
            return Ok(conn);
        }

        let conn = self.client.get_multiplexed_async_connection().await?;
        *self.slot() = Some(conn.clone());
        Ok(conn)
    }

    pub fn is_connected(&self) -> bool {
        self.slot().is_some()
    }
}

/// Clears the cached connection on drop unless disarmed
struct ResetOnDrop<'a> {
    cache: &'a Cache,
    armed: bool,
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.slot().take();
        }
    }
}

#[async_trait]
impl Probe for Cache {
    async fn ping(&self) -> Result<(), ProbeError> {
        let mut conn = self.connection().await?;
        let mut reset = ResetOnDrop {
            cache: self,
            armed: true,
        };
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        reset.armed = false;
        Ok(())
    }
}

#[async_trait]
impl Releasable for Cache {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn release(&self) -> Result<(), ReleaseError> {
        // Dropping the last handle closes the socket
        self.slot().take();
        Ok(())
    }
}
