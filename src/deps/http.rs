//! Outbound HTTP client

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use crate::lifecycle::{ReleaseError, Releasable};

/// Shared `reqwest` client, held until drain releases it
pub struct HttpClient {
    client: Mutex<Option<reqwest::Client>>,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client: Mutex::new(Some(client)),
        })
    }

    /// A handle to the client, or `None` once released
    pub fn client(&self) -> Option<reqwest::Client> {
        self.client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Releasable for HttpClient {
    fn name(&self) -> &'static str {
        "http_client"
    }

    async fn release(&self) -> Result<(), ReleaseError> {
        self.client
            .lock()
            .map_err(|e| ReleaseError::Failed {
                resource: "http_client",
                reason: e.to_string(),
            })?
            .take();
        Ok(())
    }
}
