//! Optional router integrations
//!
//! Each integration is checked against configuration at startup and layered
//! onto the router only when enabled. The core routes and the request
//! interceptor never depend on any of them.

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;

#[derive(Debug, Clone, Default)]
pub struct Integrations {
    /// Per-request spans and events from `tower-http`
    pub http_tracing: bool,
}

impl Integrations {
    pub fn from_config(config: &Config) -> Self {
        Self {
            http_tracing: config.trace_http,
        }
    }

    /// Names of the integrations that will be activated
    pub fn enabled(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.http_tracing {
            names.push("http_tracing");
        }
        names
    }

    /// Layer every enabled integration onto `router`
    pub fn apply(&self, router: Router) -> Router {
        let mut router = router;
        if self.http_tracing {
            info!("enabling http tracing");
            router = router.layer(TraceLayer::new_for_http());
        }
        router
    }
}
