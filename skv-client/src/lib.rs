//! # skv Sync Client
//!
//! Purpose: Give application code typed, pooled access to a Redis-compatible
//! store: expiring values, hashes, sets, incremental key scans, an
//! expiry-only lock, and streams with consumer groups.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Reuse TCP connections across callers.
//! 2. **Explicit Handle**: One `StoreClient`, built by `initialize`, passed by
//!    reference; no global state.
//! 3. **Typed Absence**: Missing data is `ErrorKind::NotFound`, never an
//!    empty success.
//! 4. **Protocol Clarity**: Encode/parse RESP2 explicitly for correctness.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use skv_client::{ClientConfig, StoreClient};
//!
//! let client = StoreClient::initialize(ClientConfig::with_addr("127.0.0.1:6379"))?;
//! client.ensure_group("orders", "workers")?;
//! client.append_data("orders", b"order-1")?;
//! let batch = client.read_group_blocking("orders", "workers", "c1", 10, Duration::from_secs(1))?;
//! let ids: Vec<_> = batch.iter().map(|message| message.id).collect();
//! client.acknowledge("orders", "workers", &ids)?;
//! # Ok::<(), skv_client::ClientError>(())
//! ```

mod client;
mod config;
mod error;
mod group;
mod hash;
mod kv;
mod lock;
mod pool;
mod resp;
mod scan;
mod set;
mod stream;

pub use client::StoreClient;
pub use config::{ClientConfig, DEFAULT_POOL_SIZE};
pub use error::{ClientError, ClientResult, ErrorKind};
pub use group::{GroupCreation, GroupInfo, PendingSummary};
pub use kv::{Expiry, Ttl};
pub use pool::ConnectionPool;
pub use scan::{KeyScan, ScanPage, SCAN_START};
pub use stream::{MessageId, ParseMessageIdError, StreamMessage, DATA_FIELD};
