//! # Connection Pool
//!
//! Purpose: Share a bounded set of TCP connections between every caller of
//! the client.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Keep at most `pool_size` connections alive.
//! 2. **Minimal Locking**: Hold the mutex only while moving idle connections;
//!    connects and round trips happen outside it.
//! 3. **Bounded Waiting**: An exhausted pool parks callers on a condvar for at
//!    most `pool_timeout`, then fails with `PoolExhausted`.
//! 4. **Lazy Recycling**: Idle connections past `idle_timeout` are closed on
//!    the acquire path; no background thread is started.
//! 5. **Cache-Friendly Buffers**: Each connection reuses its own buffers.

use std::collections::VecDeque;
use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::resp::{encode_command, read_response, RespValue};

/// Extra read headroom granted on top of a server-side block window.
const BLOCKING_READ_SLACK: Duration = Duration::from_secs(1);

struct IdleConnection {
    conn: Connection,
    since: Instant,
}

struct PoolState {
    // Most recently returned connection sits at the back.
    idle: VecDeque<IdleConnection>,
    total: usize,
    last_reap: Instant,
}

struct PoolInner {
    config: ClientConfig,
    max_total: usize,
    state: Mutex<PoolState>,
    available: Condvar,
}

/// Connection pool handle.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Creates a new connection pool with the provided configuration.
    ///
    /// No connection is opened until the first `acquire`.
    pub(crate) fn new(config: ClientConfig) -> Self {
        let max_total = config.effective_pool_size();
        let state = PoolState {
            idle: VecDeque::with_capacity(max_total),
            total: 0,
            last_reap: Instant::now(),
        };
        ConnectionPool {
            inner: Arc::new(PoolInner {
                config,
                max_total,
                state: Mutex::new(state),
                available: Condvar::new(),
            }),
        }
    }

    /// Acquires a connection, waiting up to `pool_timeout` for a free slot.
    pub(crate) fn acquire(&self) -> ClientResult<PooledConnection> {
        let config = &self.inner.config;
        let deadline = Instant::now() + config.pool_timeout;
        let mut state = self.inner.state.lock();

        loop {
            self.reap_if_due(&mut state);

            if let Some(conn) = self.pop_fresh(&mut state) {
                return Ok(PooledConnection::new(self.inner.clone(), conn));
            }

            if state.total < self.inner.max_total {
                state.total += 1;
                drop(state);
                return match Connection::connect(config) {
                    Ok(conn) => Ok(PooledConnection::new(self.inner.clone(), conn)),
                    Err(err) => {
                        self.release_slot();
                        Err(err)
                    }
                };
            }

            if Instant::now() >= deadline {
                warn!(
                    pool_size = self.inner.max_total,
                    timeout_ms = config.pool_timeout.as_millis() as u64,
                    "no pooled connection became available"
                );
                return Err(ClientError::PoolExhausted);
            }
            self.inner.available.wait_until(&mut state, deadline);
        }
    }

    /// Number of connections currently open (idle + in-use).
    pub fn total_connections(&self) -> usize {
        self.inner.state.lock().total
    }

    /// Number of idle connections ready for reuse.
    pub fn idle_connections(&self) -> usize {
        self.inner.state.lock().idle.len()
    }

    fn pop_fresh(&self, state: &mut PoolState) -> Option<Connection> {
        let idle_timeout = self.inner.config.idle_timeout;
        while let Some(idle) = state.idle.pop_back() {
            if idle.since.elapsed() < idle_timeout {
                return Some(idle.conn);
            }
            // Everything older sits in front of this one.
            let stale = state.idle.len() + 1;
            state.idle.clear();
            state.total = state.total.saturating_sub(stale);
            debug!(closed = stale, "closed idle connections past idle timeout");
        }
        None
    }

    fn reap_if_due(&self, state: &mut PoolState) {
        let config = &self.inner.config;
        if state.last_reap.elapsed() < config.idle_check_interval {
            return;
        }
        state.last_reap = Instant::now();

        let before = state.idle.len();
        state
            .idle
            .retain(|idle| idle.since.elapsed() < config.idle_timeout);
        let closed = before - state.idle.len();
        if closed > 0 {
            state.total = state.total.saturating_sub(closed);
            debug!(closed, "reaped idle connections");
        }
    }

    fn release_slot(&self) {
        release_slot(&self.inner);
    }
}

fn release_slot(inner: &PoolInner) {
    let mut state = inner.state.lock();
    state.total = state.total.saturating_sub(1);
    drop(state);
    inner.available.notify_one();
}

fn return_connection(inner: &PoolInner, conn: Connection) {
    let mut state = inner.state.lock();
    state.idle.push_back(IdleConnection {
        conn,
        since: Instant::now(),
    });
    drop(state);
    inner.available.notify_one();
}

/// RAII wrapper returning a connection to the pool on drop.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<Connection>,
    valid: bool,
}

impl PooledConnection {
    fn new(pool: Arc<PoolInner>, conn: Connection) -> Self {
        PooledConnection {
            pool,
            conn: Some(conn),
            valid: true,
        }
    }

    /// Executes a RESP command and returns the parsed reply.
    pub fn exec(&mut self, args: &[&[u8]]) -> ClientResult<RespValue> {
        let conn = self.conn.as_mut().expect("connection present until drop");
        let response = conn.exec(args, None);
        if response.is_err() {
            // If IO/protocol fails, do not return this connection to the pool.
            self.valid = false;
        }
        response
    }

    /// Executes a command the server may hold for up to `wait` before replying.
    pub fn exec_blocking(&mut self, args: &[&[u8]], wait: Duration) -> ClientResult<RespValue> {
        let conn = self.conn.as_mut().expect("connection present until drop");
        let response = conn.exec(args, Some(wait + BLOCKING_READ_SLACK));
        if response.is_err() {
            self.valid = false;
        }
        response
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => return,
        };

        if self.valid {
            return_connection(&self.pool, conn);
        } else {
            warn!(addr = %conn.peer, "discarding connection after failed exchange");
            release_slot(&self.pool);
        }
    }
}

/// Single TCP connection with reusable buffers.
///
/// The buffers are stored on the connection to avoid per-call allocations.
pub struct Connection {
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: BufReader<TcpStream>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
    read_timeout: Option<Duration>,
    peer: SocketAddr,
}

impl Connection {
    fn connect(config: &ClientConfig) -> ClientResult<Self> {
        let (stream, peer) = connect_stream(config)?;
        if let Some(timeout) = config.read_timeout {
            stream.set_read_timeout(Some(timeout))?;
        }
        if let Some(timeout) = config.write_timeout {
            stream.set_write_timeout(Some(timeout))?;
        }
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)?;

        let mut conn = Connection {
            reader: BufReader::new(stream),
            line_buf: Vec::with_capacity(128),
            write_buf: Vec::with_capacity(256),
            read_timeout: config.read_timeout,
            peer,
        };
        conn.handshake(config)?;
        debug!(addr = %peer, db = config.database, "opened connection");
        Ok(conn)
    }

    fn handshake(&mut self, config: &ClientConfig) -> ClientResult<()> {
        if !config.password.is_empty() {
            expect_ok(self.exec(&[b"AUTH", config.password.as_bytes()], None)?)?;
        }
        if config.database != 0 {
            let db = config.database.to_string();
            expect_ok(self.exec(&[b"SELECT", db.as_bytes()], None)?)?;
        }
        Ok(())
    }

    fn exec(&mut self, args: &[&[u8]], wait: Option<Duration>) -> ClientResult<RespValue> {
        self.write_buf.clear();
        encode_command(args, &mut self.write_buf);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        // Widen the read timeout only when it would cut a blocking command short.
        let widened = match (wait, self.read_timeout) {
            (Some(wait), Some(base)) if wait > base => {
                self.reader.get_ref().set_read_timeout(Some(wait))?;
                true
            }
            _ => false,
        };

        let response = read_response(&mut self.reader, &mut self.line_buf);

        if widened {
            self.reader.get_ref().set_read_timeout(self.read_timeout)?;
        }
        response
    }
}

fn expect_ok(reply: RespValue) -> ClientResult<()> {
    match reply {
        RespValue::Simple(_) => Ok(()),
        RespValue::Error(message) => Err(ClientError::from_reply(message)),
        _ => Err(ClientError::UnexpectedResponse),
    }
}

fn connect_stream(config: &ClientConfig) -> ClientResult<(TcpStream, SocketAddr)> {
    let addr = config
        .addr
        .to_socket_addrs()
        .map_err(|_| ClientError::InvalidAddress)?
        .next()
        .ok_or(ClientError::InvalidAddress)?;
    let stream = match config.connect_timeout {
        Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
        None => TcpStream::connect(addr)?,
    };
    Ok((stream, addr))
}
