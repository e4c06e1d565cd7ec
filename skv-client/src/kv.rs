//! # Key-Value Operations
//!
//! Plain string/integer values with optional expiry.
//!
//! "No expiry" has exactly one representation, `Expiry::Never`, and it is
//! encoded by leaving the expiry option off the command. Non-positive second
//! counts and zero durations both normalise to it.

use std::time::Duration;

use crate::client::{encode_u64, StoreClient};
use crate::error::{ClientError, ClientResult};
use crate::resp::RespValue;

/// Expiry requested for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiry {
    /// The key never expires.
    #[default]
    Never,
    /// The key expires after the given duration.
    After(Duration),
}

impl Expiry {
    /// Seconds-based constructor: zero or negative means no expiry.
    pub fn from_secs(secs: i64) -> Self {
        if secs <= 0 {
            Expiry::Never
        } else {
            Expiry::After(Duration::from_secs(secs as u64))
        }
    }

    /// Duration-based constructor: a zero duration means no expiry.
    pub fn after(ttl: Duration) -> Self {
        if ttl.is_zero() {
            Expiry::Never
        } else {
            Expiry::After(ttl)
        }
    }

    pub(crate) fn to_arg(self) -> Option<ExpiryArg> {
        match self {
            Expiry::Never => None,
            Expiry::After(ttl) => ExpiryArg::new(ttl),
        }
    }
}

/// TTL state returned by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Key is missing or already expired.
    Missing,
    /// Key exists without expiration.
    NoExpiry,
    /// Key expires after the provided duration.
    ExpiresIn(Duration),
}

/// A positive TTL rendered as command arguments, seconds when exact and
/// milliseconds otherwise.
pub(crate) struct ExpiryArg {
    millis: bool,
    digits: ([u8; 20], usize),
}

impl ExpiryArg {
    pub(crate) fn new(ttl: Duration) -> Option<Self> {
        if ttl.is_zero() {
            return None;
        }
        if ttl.subsec_nanos() == 0 {
            return Some(ExpiryArg {
                millis: false,
                digits: encode_u64(ttl.as_secs()),
            });
        }
        let ms = ttl.as_millis().max(1).min(u64::MAX as u128) as u64;
        Some(ExpiryArg {
            millis: true,
            digits: encode_u64(ms),
        })
    }

    /// `EX` or `PX`, for `SET`.
    pub(crate) fn set_option(&self) -> &'static [u8] {
        if self.millis {
            b"PX"
        } else {
            b"EX"
        }
    }

    pub(crate) fn value(&self) -> &[u8] {
        &self.digits.0[..self.digits.1]
    }
}

impl StoreClient {
    /// Fetches a UTF-8 value. Absence is `ClientError::NotFound`.
    pub fn get(&self, key: &str) -> ClientResult<String> {
        let data = self.get_bytes(key)?;
        String::from_utf8(data).map_err(|_| ClientError::TypeMismatch {
            message: format!("value at '{key}' is not valid UTF-8"),
        })
    }

    /// Fetches a raw value. Absence is `ClientError::NotFound`.
    pub fn get_bytes(&self, key: &str) -> ClientResult<Vec<u8>> {
        match self.call(&[b"GET", key.as_bytes()])? {
            RespValue::Bulk(Some(data)) => Ok(data),
            RespValue::Bulk(None) => Err(ClientError::NotFound),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Fetches a value and parses it as a signed 64-bit integer.
    pub fn get_int64(&self, key: &str) -> ClientResult<i64> {
        let data = self.get_bytes(key)?;
        std::str::from_utf8(&data)
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| ClientError::TypeMismatch {
                message: format!("value at '{key}' is not an integer"),
            })
    }

    /// Fetches several values at once; `None` marks keys that are absent.
    pub fn multi_get(&self, keys: &[&str]) -> ClientResult<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut args: Vec<&[u8]> = Vec::with_capacity(keys.len() + 1);
        args.push(b"MGET");
        args.extend(keys.iter().map(|key| key.as_bytes()));

        let items = self.call(&args)?.into_array()?;
        if items.len() != keys.len() {
            return Err(ClientError::UnexpectedResponse);
        }
        items
            .into_iter()
            .map(|item| match item {
                RespValue::Bulk(data) => Ok(data),
                _ => Err(ClientError::UnexpectedResponse),
            })
            .collect()
    }

    /// Writes a value, replacing any previous value and TTL.
    pub fn set(&self, key: &str, value: impl AsRef<[u8]>, expiry: Expiry) -> ClientResult<()> {
        let expiry = expiry.to_arg();
        let mut args: Vec<&[u8]> = vec![&b"SET"[..], key.as_bytes(), value.as_ref()];
        if let Some(arg) = &expiry {
            args.push(arg.set_option());
            args.push(arg.value());
        }
        self.call_ok(&args)
    }

    /// Writes an integer value.
    pub fn set_int64(&self, key: &str, value: i64, expiry: Expiry) -> ClientResult<()> {
        self.set(key, value.to_string(), expiry)
    }

    /// Conditional write: returns true only if this call created the key.
    pub fn set_if_absent(
        &self,
        key: &str,
        value: impl AsRef<[u8]>,
        expiry: Expiry,
    ) -> ClientResult<bool> {
        let expiry = expiry.to_arg();
        let mut args: Vec<&[u8]> = vec![&b"SET"[..], key.as_bytes(), value.as_ref()];
        args.push(b"NX");
        if let Some(arg) = &expiry {
            args.push(arg.set_option());
            args.push(arg.value());
        }
        match self.call(&args)? {
            RespValue::Simple(_) => Ok(true),
            RespValue::Bulk(None) | RespValue::Null => Ok(false),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Replaces the value while keeping the key's current TTL.
    pub fn set_keep_ttl(&self, key: &str, value: impl AsRef<[u8]>) -> ClientResult<()> {
        self.call_ok(&[b"SET", key.as_bytes(), value.as_ref(), b"KEEPTTL"])
    }

    /// Writes a value that must expire; a zero TTL is rejected.
    pub fn set_with_expiry(
        &self,
        key: &str,
        value: impl AsRef<[u8]>,
        ttl: Duration,
    ) -> ClientResult<()> {
        let arg = ExpiryArg::new(ttl)
            .ok_or(ClientError::InvalidArgument("set_with_expiry requires a positive ttl"))?;
        let command: &[u8] = if arg.millis { b"PSETEX" } else { b"SETEX" };
        self.call_ok(&[command, key.as_bytes(), arg.value(), value.as_ref()])
    }

    /// Increments an integer value and returns the result.
    ///
    /// Missing keys start at zero; non-integer content is a type mismatch.
    pub fn increment(&self, key: &str) -> ClientResult<i64> {
        match self.call(&[b"INCR", key.as_bytes()])? {
            RespValue::Integer(value) => Ok(value),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Sets a time-to-live on a key. Returns false when the key is absent.
    pub fn expire(&self, key: &str, ttl: Duration) -> ClientResult<bool> {
        let arg =
            ExpiryArg::new(ttl).ok_or(ClientError::InvalidArgument("expire requires a positive ttl"))?;
        let command: &[u8] = if arg.millis { b"PEXPIRE" } else { b"EXPIRE" };
        match self.call(&[command, key.as_bytes(), arg.value()])? {
            RespValue::Integer(value) => Ok(value == 1),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Returns TTL status for a key.
    pub fn ttl(&self, key: &str) -> ClientResult<Ttl> {
        match self.call(&[b"TTL", key.as_bytes()])? {
            RespValue::Integer(-2) => Ok(Ttl::Missing),
            RespValue::Integer(-1) => Ok(Ttl::NoExpiry),
            RespValue::Integer(value) if value >= 0 => {
                Ok(Ttl::ExpiresIn(Duration::from_secs(value as u64)))
            }
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Returns true when the key exists.
    pub fn exists(&self, key: &str) -> ClientResult<bool> {
        match self.call(&[b"EXISTS", key.as_bytes()])? {
            RespValue::Integer(count) => Ok(count > 0),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Deletes a key. Returns true when a key was removed.
    pub fn delete(&self, key: &str) -> ClientResult<bool> {
        match self.call(&[b"DEL", key.as_bytes()])? {
            RespValue::Integer(count) => Ok(count > 0),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}
