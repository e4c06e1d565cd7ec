//! # Synchronous Client API
//!
//! Purpose: Expose the explicit client handle every component works through.
//! The data operations live next to their data model (`kv`, `hash`, `set`,
//! `scan`, `lock`, `stream`, `group`) as further `impl StoreClient` blocks.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `StoreClient` hides pooling and protocol details.
//! 2. **Explicit Handle**: Constructed once, cloned or borrowed by callers;
//!    there is no process-global instance.
//! 3. **Fail Fast**: Protocol violations surface immediately as errors.
//! 4. **Stateless Calls**: Each call acquires a connection, runs one command,
//!    and returns the connection to the pool.

use std::time::Duration;

use tracing::{error, info};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::pool::ConnectionPool;
use crate::resp::RespValue;

/// Synchronous client with connection pooling.
///
/// Cloning is cheap: clones share the same pool.
#[derive(Clone)]
pub struct StoreClient {
    pool: ConnectionPool,
}

impl StoreClient {
    /// Builds the pool and runs an `INFO` liveness check.
    ///
    /// A failed check is reported as `ClientError::FatalInit`; whether that
    /// aborts the process is the caller's decision.
    pub fn initialize(config: ClientConfig) -> ClientResult<Self> {
        let addr = config.addr.clone();
        let client = Self::with_config(config);
        match client.info(None) {
            Ok(_) => {
                info!(%addr, "store client initialized");
                Ok(client)
            }
            Err(source) => {
                error!(%addr, error = %source, "store liveness check failed");
                Err(ClientError::FatalInit {
                    source: Box::new(source),
                })
            }
        }
    }

    /// Creates a client with default configuration and checks liveness.
    pub fn connect(addr: impl Into<String>) -> ClientResult<Self> {
        Self::initialize(ClientConfig::with_addr(addr))
    }

    /// Creates a client without contacting the store.
    pub fn with_config(config: ClientConfig) -> Self {
        StoreClient {
            pool: ConnectionPool::new(config),
        }
    }

    /// The pool shared by all clones of this client.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Pings the server. Returns the raw response payload.
    pub fn ping(&self, payload: Option<&[u8]>) -> ClientResult<Vec<u8>> {
        let response = match payload {
            Some(data) => self.call(&[b"PING", data])?,
            None => self.call(&[b"PING"])?,
        };
        response.into_bytes()
    }

    /// Fetches server INFO output, optionally for a single section.
    pub fn info(&self, section: Option<&str>) -> ClientResult<Vec<u8>> {
        let response = match section {
            Some(section) => self.call(&[b"INFO", section.as_bytes()])?,
            None => self.call(&[b"INFO"])?,
        };
        match response {
            RespValue::Bulk(Some(data)) => Ok(data),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Runs one command on a pooled connection, turning error replies into
    /// `ClientError`.
    pub(crate) fn call(&self, args: &[&[u8]]) -> ClientResult<RespValue> {
        let mut conn = self.pool.acquire()?;
        match conn.exec(args)? {
            RespValue::Error(message) => Err(ClientError::from_reply(message)),
            reply => Ok(reply),
        }
    }

    /// Like `call`, for commands the server may hold for up to `wait`.
    pub(crate) fn call_blocking(&self, args: &[&[u8]], wait: Duration) -> ClientResult<RespValue> {
        let mut conn = self.pool.acquire()?;
        match conn.exec_blocking(args, wait)? {
            RespValue::Error(message) => Err(ClientError::from_reply(message)),
            reply => Ok(reply),
        }
    }

    /// Runs a command whose only success reply is a simple string.
    pub(crate) fn call_ok(&self, args: &[&[u8]]) -> ClientResult<()> {
        match self.call(args)? {
            RespValue::Simple(_) => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

pub(crate) fn encode_u64(mut value: u64) -> ([u8; 20], usize) {
    // Stack buffer keeps conversion allocation-free (zero-cost abstraction).
    let mut buf = [0u8; 20];
    let mut len = 0;
    if value == 0 {
        buf[0] = b'0';
        return (buf, 1);
    }
    while value > 0 {
        buf[len] = b'0' + (value % 10) as u8;
        value /= 10;
        len += 1;
    }
    buf[..len].reverse();
    (buf, len)
}
