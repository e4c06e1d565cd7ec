//! # Stream Producer
//!
//! Purpose: Append messages to a stream and define the message types shared
//! with the consumer-group reader.
//!
//! ## Message IDs
//!
//! The server assigns every message an id of the form `<ms>-<seq>`, strictly
//! increasing within a stream. `MessageId` keeps both halves as integers so
//! ordering is numeric, never lexicographic:
//!
//! ```text
//! 1718000000000-0 < 1718000000000-1 < 1718000000001-0
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::client::StoreClient;
use crate::error::{ClientError, ClientResult};
use crate::resp::RespValue;

/// Field name used by `append_data`.
pub const DATA_FIELD: &str = "data";

/// Server-assigned message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId {
    /// Milliseconds part.
    pub ms: u64,
    /// Sequence number within the millisecond.
    pub seq: u64,
}

impl MessageId {
    /// Creates an id from its two halves.
    pub const fn new(ms: u64, seq: u64) -> Self {
        MessageId { ms, seq }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// Error returned when text is not a valid message id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid message id '{0}'")]
pub struct ParseMessageIdError(String);

impl FromStr for MessageId {
    type Err = ParseMessageIdError;

    /// Accepts `<ms>-<seq>`, or a bare `<ms>` meaning sequence 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseMessageIdError(s.to_string());
        let (ms, seq) = match s.split_once('-') {
            Some((ms, seq)) => (ms, seq),
            None => (s, "0"),
        };
        let ms = ms.parse().map_err(|_| invalid())?;
        let seq = seq.parse().map_err(|_| invalid())?;
        Ok(MessageId { ms, seq })
    }
}

/// One stream entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    pub id: MessageId,
    /// Field/value pairs in the order they were written.
    pub fields: Vec<(String, Vec<u8>)>,
}

impl StreamMessage {
    /// Value of the first field called `name`.
    pub fn field(&self, name: &str) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_slice())
    }
}

impl StoreClient {
    /// Appends one message and returns the id the server assigned.
    ///
    /// Fails with a type mismatch if `stream` holds a non-stream value.
    pub fn append<F, V>(&self, stream: &str, fields: &[(F, V)]) -> ClientResult<MessageId>
    where
        F: AsRef<str>,
        V: AsRef<[u8]>,
    {
        if fields.is_empty() {
            return Err(ClientError::InvalidArgument("a message needs at least one field"));
        }
        let mut args: Vec<&[u8]> = Vec::with_capacity(fields.len() * 2 + 3);
        args.push(b"XADD");
        args.push(stream.as_bytes());
        args.push(b"*");
        for (field, value) in fields {
            args.push(field.as_ref().as_bytes());
            args.push(value.as_ref());
        }
        parse_id(self.call(&args)?)
    }

    /// Appends a single-field message carrying `data` under `DATA_FIELD`.
    pub fn append_data(&self, stream: &str, data: impl AsRef<[u8]>) -> ClientResult<MessageId> {
        self.append(stream, &[(DATA_FIELD, data.as_ref())])
    }

    /// Number of messages currently in the stream (0 when absent).
    pub fn stream_len(&self, stream: &str) -> ClientResult<u64> {
        match self.call(&[b"XLEN", stream.as_bytes()])? {
            RespValue::Integer(len) => Ok(len.max(0) as u64),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

pub(crate) fn parse_id(value: RespValue) -> ClientResult<MessageId> {
    value.into_string()?.parse().map_err(|_| ClientError::Protocol)
}

/// Decodes the `[[id, [field, value, ...]], ...]` entry list of a stream reply.
pub(crate) fn parse_entries(value: RespValue) -> ClientResult<Vec<StreamMessage>> {
    value.into_array()?.into_iter().map(parse_entry).collect()
}

fn parse_entry(value: RespValue) -> ClientResult<StreamMessage> {
    let mut parts = value.into_array()?.into_iter();
    let (id, body) = match (parts.next(), parts.next()) {
        (Some(id), Some(body)) => (id, body),
        _ => return Err(ClientError::UnexpectedResponse),
    };
    let id = parse_id(id)?;

    // Pending entries that were deleted come back with a null body.
    let body = match body {
        RespValue::Null | RespValue::Bulk(None) => Vec::new(),
        other => other.into_array()?,
    };
    if body.len() % 2 != 0 {
        return Err(ClientError::UnexpectedResponse);
    }
    let mut fields = Vec::with_capacity(body.len() / 2);
    let mut body = body.into_iter();
    while let (Some(field), Some(value)) = (body.next(), body.next()) {
        fields.push((field.into_string()?, value.into_bytes()?));
    }
    Ok(StreamMessage { id, fields })
}
