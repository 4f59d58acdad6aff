//! Handles to downstream dependencies
//!
//! Built once at startup from [`Config`]. Each handle doubles as the probe
//! for its dependency and as a resource released during drain.

mod cache;
mod database;
mod http;

pub use cache::Cache;
pub use database::Database;
pub use http::HttpClient;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::health::DependencyCheck;
use crate::lifecycle::Releasable;

/// Name used in readiness labels for the database (`db:ok`, `db:fail`, ...)
pub const DATABASE_CHECK: &str = "db";
/// Name used in readiness labels for the cache
pub const CACHE_CHECK: &str = "redis";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid database configuration: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid cache configuration: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct Dependencies {
    pub http: Arc<HttpClient>,
    pub cache: Option<Arc<Cache>>,
    pub database: Option<Arc<Database>>,
}

impl Dependencies {
    /// Create handles for every configured dependency. Nothing connects yet.
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let timeout: Duration = config.dep_timeout.into();
        let http = Arc::new(HttpClient::new(timeout)?);

        let cache = match config.redis_url() {
            Some(url) => {
                info!("Cache configured");
                Some(Arc::new(Cache::open(url)?))
            }
            None => None,
        };

        let database = match config.database_url() {
            Some(url) => {
                info!(
                    max_connections = config.database_max_connections,
                    "Database configured"
                );
                Some(Arc::new(Database::connect_lazy(
                    url,
                    config.database_max_connections,
                    timeout,
                )?))
            }
            None => None,
        };

        Ok(Self {
            http,
            cache,
            database,
        })
    }

    /// Readiness checks, one per known dependency whether configured or not
    pub fn checks(&self) -> Vec<DependencyCheck> {
        let database = match &self.database {
            Some(db) => DependencyCheck::configured(DATABASE_CHECK, db.clone()),
            None => DependencyCheck::disabled(DATABASE_CHECK),
        };
        let cache = match &self.cache {
            Some(cache) => DependencyCheck::configured(CACHE_CHECK, cache.clone()),
            None => DependencyCheck::disabled(CACHE_CHECK),
        };
        vec![database, cache]
    }

    /// Resources in release order: HTTP client, cache, database
    pub fn releasables(&self) -> Vec<Arc<dyn Releasable>> {
        let mut resources: Vec<Arc<dyn Releasable>> = vec![self.http.clone()];
        if let Some(cache) = &self.cache {
            resources.push(cache.clone());
        }
        if let Some(database) = &self.database {
            resources.push(database.clone());
        }
        resources
    }
}

#[cfg(test)]
#[path = "deps_test.rs"]
mod tests;
