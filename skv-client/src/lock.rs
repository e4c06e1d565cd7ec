//! # Expiring Single-Key Lock
//!
//! A lock is a key written with set-if-absent and a TTL. Holding it means the
//! key exists. There is no release and no renewal: the TTL running out is the
//! only way a lock is given up, even if the holder is still working.
//! Nothing here checks ownership tokens, coordinates replicas, or fences
//! stale holders.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::client::StoreClient;
use crate::error::{ClientError, ClientResult};
use crate::kv::Expiry;

impl StoreClient {
    /// Tries to take the lock at `key`, storing `token` for `ttl`.
    ///
    /// Returns false while anyone (including this caller) still holds it.
    pub fn try_lock(&self, key: &str, token: impl AsRef<[u8]>, ttl: Duration) -> ClientResult<bool> {
        if ttl.is_zero() {
            return Err(ClientError::InvalidArgument("lock ttl must be positive"));
        }
        let acquired = self.set_if_absent(key, token, Expiry::After(ttl))?;
        debug!(key, acquired, ttl_ms = ttl.as_millis() as u64, "lock attempt");
        Ok(acquired)
    }

    /// `try_lock` with the current Unix time in milliseconds as the token.
    pub fn lock_timestamp(&self, key: &str, ttl: Duration) -> ClientResult<bool> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        self.try_lock(key, now.to_string(), ttl)
    }
}
