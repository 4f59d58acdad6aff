//! Postgres connection pool

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::health::{Probe, ProbeError};
use crate::lifecycle::{ReleaseError, Releasable};

pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Build a pool without opening any connection.
    ///
    /// Only the URL is validated here; an unreachable server surfaces later
    /// as a failing readiness probe.
    pub fn connect_lazy(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(url)?;
        Ok(Self { pool })
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[async_trait]
impl Probe for Database {
    async fn ping(&self) -> Result<(), ProbeError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Releasable for Database {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn release(&self) -> Result<(), ReleaseError> {
        self.pool.close().await;
        Ok(())
    }
}
