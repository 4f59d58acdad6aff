//! Environment configuration
//!
//! Every setting is optional and falls back to a default suitable for local
//! development. Durations are expressed in (possibly fractional) seconds.

use std::str::FromStr;
use std::time::Duration;

use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "8000")]
    pub port: u16,

    #[envconfig(from = "ENVIRONMENT", default = "development")]
    pub environment: String,

    #[envconfig(from = "POD_ID", default = "unknown")]
    pub pod_id: String,

    #[envconfig(from = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[envconfig(from = "DATABASE_MAX_CONNECTIONS", default = "5")]
    pub database_max_connections: u32,

    #[envconfig(from = "REDIS_URL")]
    pub redis_url: Option<String>,

    #[envconfig(from = "METRICS_TOKEN")]
    pub metrics_token: Option<String>,

    /// Upper bound for a single dependency check attempt
    #[envconfig(from = "DEP_TIMEOUT_SECONDS", default = "1.5")]
    pub dep_timeout: EnvSecsDuration,

    /// How long the drain waits for in-flight requests before giving up
    #[envconfig(from = "SHUTDOWN_GRACE_SECONDS", default = "40")]
    pub shutdown_grace: EnvSecsDuration,

    /// Delay applied by /prestop before it answers
    #[envconfig(from = "PRESTOP_DELAY_SECONDS", default = "8")]
    pub prestop_delay: EnvSecsDuration,

    #[envconfig(from = "TRACE_HTTP", default = "false")]
    pub trace_http: bool,

    #[envconfig(from = "LOG_FORMAT", default = "json")]
    pub log_format: LogFormat,
}

impl Config {
    /// Produce a host:port address for binding a TcpListener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn database_url(&self) -> Option<&str> {
        non_empty(&self.database_url)
    }

    pub fn redis_url(&self) -> Option<&str> {
        non_empty(&self.redis_url)
    }

    /// Compared byte for byte against the bearer token, so it is not trimmed
    pub fn metrics_token(&self) -> Option<&str> {
        self.metrics_token
            .as_deref()
            .filter(|v| !v.trim().is_empty())
    }
}

// An exported-but-empty variable is treated the same as an unset one.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvSecsDuration(pub Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvSecsDurationError;

impl FromStr for EnvSecsDuration {
    type Err = ParseEnvSecsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let secs = s
            .trim()
            .parse::<f64>()
            .map_err(|_| ParseEnvSecsDurationError)?;

        Duration::try_from_secs_f64(secs)
            .map(EnvSecsDuration)
            .map_err(|_| ParseEnvSecsDurationError)
    }
}

impl From<EnvSecsDuration> for Duration {
    fn from(value: EnvSecsDuration) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseLogFormatError(pub String);

impl FromStr for LogFormat {
    type Err = ParseLogFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_ref() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(ParseLogFormatError(other.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
