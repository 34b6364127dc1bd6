use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_COOLDOWN_WINDOW: Duration = Duration::from_secs(180);
pub const DEFAULT_KUBE_API_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
pub const DEFAULT_COUNTER_LOG_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub recovery: RecoveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub addr: String,
    /// Webhook payloads larger than this are rejected before decoding.
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Minimum time between two successful mutations of the same namespace/app.
    pub cooldown_window: Duration,
    /// Deadline attached to every call against the Kubernetes API.
    pub kube_api_timeout: Duration,
    /// Upper bound for the `scale` action. `None` leaves growth unbounded.
    pub max_replicas: Option<i32>,
    /// Treat several workloads sharing one `app` label as an error instead of
    /// acting on the first one returned.
    pub strict_workload_match: bool,
    /// Period of the counter summary log line. `None` disables it.
    pub counter_log_interval: Option<Duration>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            cooldown_window: DEFAULT_COOLDOWN_WINDOW,
            kube_api_timeout: DEFAULT_KUBE_API_TIMEOUT,
            max_replicas: None,
            strict_workload_match: false,
            counter_log_interval: Some(DEFAULT_COUNTER_LOG_INTERVAL),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults
    /// for anything unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_var(&lookup, "PORT")?.unwrap_or(DEFAULT_PORT);
        let addr = lookup("SERVER_ADDR").unwrap_or_else(|| format!("0.0.0.0:{}", port));

        let cooldown_secs: Option<u64> = parse_var(&lookup, "COOLDOWN_WINDOW_SECS")?;
        let timeout_secs: Option<u64> = parse_var(&lookup, "KUBE_API_TIMEOUT_SECS")?;
        let log_interval_secs: Option<u64> = parse_var(&lookup, "COUNTER_LOG_INTERVAL_SECS")?;

        let config = Config {
            server: ServerConfig {
                addr,
                max_body_bytes: parse_var(&lookup, "MAX_BODY_BYTES")?
                    .unwrap_or(DEFAULT_MAX_BODY_BYTES),
            },
            recovery: RecoveryConfig {
                cooldown_window: cooldown_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_COOLDOWN_WINDOW),
                kube_api_timeout: timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_KUBE_API_TIMEOUT),
                max_replicas: parse_var(&lookup, "MAX_REPLICAS")?,
                strict_workload_match: parse_var(&lookup, "STRICT_WORKLOAD_MATCH")?
                    .unwrap_or(false),
                counter_log_interval: match log_interval_secs {
                    Some(0) => None,
                    Some(secs) => Some(Duration::from_secs(secs)),
                    None => Some(DEFAULT_COUNTER_LOG_INTERVAL),
                },
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.recovery.kube_api_timeout.is_zero() {
            return Err(Error::Config(
                "KUBE_API_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if let Some(max) = self.recovery.max_replicas {
            if max < 1 {
                return Err(Error::Config(format!(
                    "MAX_REPLICAS must be at least 1, got {}",
                    max
                )));
            }
        }
        if self.server.max_body_bytes == 0 {
            return Err(Error::Config(
                "MAX_BODY_BYTES must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                addr: format!("0.0.0.0:{}", DEFAULT_PORT),
                max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            },
            recovery: RecoveryConfig::default(),
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("invalid {} value '{}': {}", key, raw, e))),
        _ => Ok(None),
    }
}
