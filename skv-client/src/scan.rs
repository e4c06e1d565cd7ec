//! # Incremental Key Scanning
//!
//! Purpose: Enumerate keys matching a glob pattern without blocking the
//! server, one cursor step at a time.
//!
//! ## Usage
//!
//! - `scan_once` performs a single step from an explicit cursor.
//! - `scan` returns a `KeyScan` iterator that yields one batch per step and
//!   stops once the server hands back cursor `0`.
//! - `enumerate_all` drains a fresh `KeyScan` into one vector.
//!
//! ## Notes
//!
//! - The count hint is advisory; batches may be larger, smaller, or empty.
//! - A pass gives no snapshot isolation: keys created or deleted while it runs
//!   may or may not appear. A `KeyScan` cannot be restarted; start a new one.
//! - A key may show up in more than one batch of a pass; `enumerate_all`
//!   drops the repeats, raw `KeyScan` batches do not.

use std::collections::HashSet;

use crate::client::{encode_u64, StoreClient};
use crate::error::{ClientError, ClientResult};

/// Cursor value that starts a pass and marks its end.
pub const SCAN_START: u64 = 0;

/// One step of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPage {
    /// Keys returned by this step.
    pub keys: Vec<String>,
    /// Cursor for the next step; `0` when the pass is complete.
    pub cursor: u64,
}

impl ScanPage {
    /// Returns true when this was the last step of the pass.
    pub fn is_last(&self) -> bool {
        self.cursor == SCAN_START
    }
}

impl StoreClient {
    /// Runs one `SCAN` step from `cursor`.
    pub fn scan_once(&self, pattern: &str, cursor: u64, count_hint: u64) -> ClientResult<ScanPage> {
        let (cursor_buf, cursor_len) = encode_u64(cursor);
        let (count_buf, count_len) = encode_u64(count_hint.max(1));
        let reply = self.call(&[
            b"SCAN",
            &cursor_buf[..cursor_len],
            b"MATCH",
            pattern.as_bytes(),
            b"COUNT",
            &count_buf[..count_len],
        ])?;

        let mut parts = reply.into_array()?.into_iter();
        let (next, keys) = match (parts.next(), parts.next(), parts.next()) {
            (Some(next), Some(keys), None) => (next, keys),
            _ => return Err(ClientError::UnexpectedResponse),
        };
        let cursor = next.into_string()?.parse().map_err(|_| ClientError::Protocol)?;
        let keys = keys
            .into_array()?
            .into_iter()
            .map(|key| key.into_string())
            .collect::<ClientResult<Vec<_>>>()?;
        Ok(ScanPage { keys, cursor })
    }

    /// Starts a lazy, one-shot pass over keys matching `pattern`.
    pub fn scan(&self, pattern: &str, count_hint: u64) -> KeyScan<'_> {
        KeyScan {
            client: self,
            pattern: pattern.to_string(),
            count_hint,
            cursor: SCAN_START,
            finished: false,
        }
    }

    /// Collects every key matching `pattern` in a single pass, each once, in
    /// first-seen order.
    pub fn enumerate_all(&self, pattern: &str, count_hint: u64) -> ClientResult<Vec<String>> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for batch in self.scan(pattern, count_hint) {
            for key in batch? {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}

/// Pull-based scan over the keyspace, yielding one batch per server step.
///
/// The iterator ends after the step that returns cursor `0`, or right after
/// yielding the first error.
pub struct KeyScan<'a> {
    client: &'a StoreClient,
    pattern: String,
    count_hint: u64,
    cursor: u64,
    finished: bool,
}

impl KeyScan<'_> {
    /// Cursor the next step will resume from.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }
}

impl Iterator for KeyScan<'_> {
    type Item = ClientResult<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self
            .client
            .scan_once(&self.pattern, self.cursor, self.count_hint)
        {
            Ok(page) => {
                self.finished = page.is_last();
                self.cursor = page.cursor;
                Some(Ok(page.keys))
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for KeyScan<'_> {}
