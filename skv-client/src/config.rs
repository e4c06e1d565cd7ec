//! # Client Configuration
//!
//! Purpose: Describe how to reach the store and how the pool behaves.
//!
//! Durations are expressed in milliseconds when deserialised, e.g.
//!
//! ```json
//! { "addr": "10.0.0.5:6379", "password": "redispw", "pool_size": 4, "pool_timeout_ms": 2000 }
//! ```

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ClientError, ClientResult};

/// Pool size used when the configured size is zero.
pub const DEFAULT_POOL_SIZE: usize = 10;

const DEFAULT_POOL_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for the client and its pool.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Password sent with AUTH; empty disables authentication.
    pub password: String,
    /// Database index selected on every new connection.
    pub database: u32,
    /// Maximum total connections (idle + in-use). Zero means the default of 10.
    pub pool_size: usize,
    /// How long `acquire` waits for a free connection.
    #[serde(rename = "pool_timeout_ms", with = "millis")]
    pub pool_timeout: Duration,
    /// Idle connections older than this are closed instead of reused.
    #[serde(rename = "idle_timeout_ms", with = "millis")]
    pub idle_timeout: Duration,
    /// Minimum spacing between sweeps of the idle list.
    #[serde(rename = "idle_check_interval_ms", with = "millis")]
    pub idle_check_interval: Duration,
    /// Optional TCP connect timeout.
    #[serde(rename = "connect_timeout_ms", with = "opt_millis")]
    pub connect_timeout: Option<Duration>,
    /// Optional TCP read timeout.
    #[serde(rename = "read_timeout_ms", with = "opt_millis")]
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    #[serde(rename = "write_timeout_ms", with = "opt_millis")]
    pub write_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: "127.0.0.1:6379".to_string(),
            password: String::new(),
            database: 0,
            pool_size: DEFAULT_POOL_SIZE,
            pool_timeout: DEFAULT_POOL_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            idle_check_interval: DEFAULT_IDLE_CHECK_INTERVAL,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Default configuration pointed at `addr`.
    pub fn with_addr(addr: impl Into<String>) -> Self {
        ClientConfig {
            addr: addr.into(),
            ..ClientConfig::default()
        }
    }

    /// Builds a configuration from `SKV_ADDR`, `SKV_PASSWORD`, `SKV_DB` and
    /// `SKV_POOL_SIZE`; unset variables keep their defaults.
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ClientConfig::default();
        if let Some(addr) = lookup("SKV_ADDR") {
            config.addr = addr;
        }
        if let Some(password) = lookup("SKV_PASSWORD") {
            config.password = password;
        }
        if let Some(db) = lookup("SKV_DB") {
            config.database = db
                .trim()
                .parse()
                .map_err(|_| ClientError::InvalidArgument("SKV_DB must be a non-negative integer"))?;
        }
        if let Some(size) = lookup("SKV_POOL_SIZE") {
            config.pool_size = size.trim().parse().map_err(|_| {
                ClientError::InvalidArgument("SKV_POOL_SIZE must be a non-negative integer")
            })?;
        }
        Ok(config)
    }

    /// Pool size with the zero-means-default rule applied.
    pub fn effective_pool_size(&self) -> usize {
        if self.pool_size == 0 {
            DEFAULT_POOL_SIZE
        } else {
            self.pool_size
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
