//! # Consumer Groups
//!
//! Purpose: Create consumer groups idempotently and move messages through
//! them: group reads (plain or blocking), acknowledgement, and deletion.
//!
//! ## Group Lifecycle
//!
//! A (stream, group) pair is in one of three states:
//!
//! ```text
//!   Absent ──ensure_group──┐
//!                          ├──▶ Ready
//!   StreamOnly ─ensure_group┘
//! ```
//!
//! `ensure_group` checks for the stream with `TYPE` before looking at its
//! groups, so a missing stream is detected from a structured reply rather
//! than from error text. If listing the groups then fails, `TYPE` is asked
//! again: a stream deleted in between is recreated, anything else is
//! reported. Both creation paths use `XGROUP CREATE ... 0
//! MKSTREAM`, starting the group at the head of the log. A `BUSYGROUP` reply
//! means another caller created the group first and counts as success.
//!
//! ## Delivery
//!
//! Reads ask for `>` (messages never delivered to this group). Returned
//! messages stay in the group's pending set until acknowledged, so a consumer
//! that dies before `acknowledge` leaves them pending. Acknowledging and
//! deleting are independent: `acknowledge` leaves the message in the stream,
//! and `delete_messages` removes it for every group.

use std::time::Duration;

use tracing::debug;

use crate::client::{encode_u64, StoreClient};
use crate::error::{ClientError, ClientResult, ErrorKind};
use crate::resp::RespValue;
use crate::stream::{parse_entries, parse_id, MessageId, StreamMessage};

/// Position new groups start reading from: the beginning of the log.
const GROUP_START_ID: &[u8] = b"0";

/// What `ensure_group` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupCreation {
    /// Neither stream nor group existed; both were created.
    CreatedWithStream,
    /// The stream existed; the group was added to it.
    Created,
    /// The group was already there.
    AlreadyExists,
}

/// Summary of one group as reported by `XINFO GROUPS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub name: String,
    pub consumers: u64,
    /// Messages delivered but not yet acknowledged.
    pub pending: u64,
    pub last_delivered_id: MessageId,
}

/// Pending-set summary as reported by `XPENDING`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingSummary {
    pub count: u64,
    pub lowest: Option<MessageId>,
    pub highest: Option<MessageId>,
    /// Pending count per consumer.
    pub consumers: Vec<(String, u64)>,
}

impl StoreClient {
    /// Makes sure `group` exists on `stream`, creating the stream if needed.
    ///
    /// Safe to call repeatedly and from several processes at once.
    pub fn ensure_group(&self, stream: &str, group: &str) -> ClientResult<GroupCreation> {
        if !self.stream_exists(stream)? {
            return self.create_on_absent_stream(stream, group);
        }

        let groups = match self.group_infos(stream) {
            Ok(groups) => groups,
            // The stream may have been deleted after the TYPE check.
            Err(err) if err.kind() == ErrorKind::Server => {
                if self.stream_exists(stream)? {
                    return Err(err);
                }
                return self.create_on_absent_stream(stream, group);
            }
            Err(err) => return Err(err),
        };
        if groups.iter().any(|info| info.name == group) {
            return Ok(GroupCreation::AlreadyExists);
        }

        let outcome = match self.create_group(stream, group)? {
            true => GroupCreation::Created,
            false => GroupCreation::AlreadyExists,
        };
        debug!(stream, group, ?outcome, "ensured group on existing stream");
        Ok(outcome)
    }

    /// Lists the groups of a stream. A missing stream is `NotFound`.
    pub fn list_groups(&self, stream: &str) -> ClientResult<Vec<GroupInfo>> {
        if !self.stream_exists(stream)? {
            return Err(ClientError::NotFound);
        }
        self.group_infos(stream)
    }

    /// Reads up to `count` messages never delivered to this group, without
    /// waiting. Nothing new is an empty vector.
    pub fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: u64,
    ) -> ClientResult<Vec<StreamMessage>> {
        if count == 0 {
            return Err(ClientError::InvalidArgument("read count must be positive"));
        }
        let (count_buf, count_len) = encode_u64(count);
        let reply = self.call(&[
            b"XREADGROUP",
            b"GROUP",
            group.as_bytes(),
            consumer.as_bytes(),
            b"COUNT",
            &count_buf[..count_len],
            b"STREAMS",
            stream.as_bytes(),
            b">",
        ])?;
        flatten_read_reply(reply)
    }

    /// Like `read_group`, but waits up to `block` for a first message.
    ///
    /// Timing out with nothing delivered is a successful empty read. A zero
    /// `block` does not wait at all.
    pub fn read_group_blocking(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        count: u64,
        block: Duration,
    ) -> ClientResult<Vec<StreamMessage>> {
        if block.is_zero() {
            // BLOCK 0 would wait forever on the server side.
            return self.read_group(stream, group, consumer, count);
        }
        if count == 0 {
            return Err(ClientError::InvalidArgument("read count must be positive"));
        }
        let (count_buf, count_len) = encode_u64(count);
        let block_ms = block.as_millis().clamp(1, u64::MAX as u128) as u64;
        let (block_buf, block_len) = encode_u64(block_ms);
        let reply = self.call_blocking(
            &[
                b"XREADGROUP",
                b"GROUP",
                group.as_bytes(),
                consumer.as_bytes(),
                b"COUNT",
                &count_buf[..count_len],
                b"BLOCK",
                &block_buf[..block_len],
                b"STREAMS",
                stream.as_bytes(),
                b">",
            ],
            block,
        )?;
        flatten_read_reply(reply)
    }

    /// Removes `ids` from the group's pending set. Returns how many were
    /// pending; ids that were not are ignored.
    pub fn acknowledge(&self, stream: &str, group: &str, ids: &[MessageId]) -> ClientResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let encoded: Vec<String> = ids.iter().map(MessageId::to_string).collect();
        let mut args: Vec<&[u8]> = Vec::with_capacity(ids.len() + 3);
        args.push(b"XACK");
        args.push(stream.as_bytes());
        args.push(group.as_bytes());
        args.extend(encoded.iter().map(|id| id.as_bytes()));
        match self.call(&args)? {
            RespValue::Integer(acked) => Ok(acked.max(0) as u64),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Deletes messages from the stream for every group. Returns how many
    /// existed.
    pub fn delete_messages(&self, stream: &str, ids: &[MessageId]) -> ClientResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let encoded: Vec<String> = ids.iter().map(MessageId::to_string).collect();
        let mut args: Vec<&[u8]> = Vec::with_capacity(ids.len() + 2);
        args.push(b"XDEL");
        args.push(stream.as_bytes());
        args.extend(encoded.iter().map(|id| id.as_bytes()));
        match self.call(&args)? {
            RespValue::Integer(deleted) => Ok(deleted.max(0) as u64),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Summarises the group's pending set. Read-only: nothing is claimed.
    pub fn pending_summary(&self, stream: &str, group: &str) -> ClientResult<PendingSummary> {
        let reply = self.call(&[b"XPENDING", stream.as_bytes(), group.as_bytes()])?;
        let mut parts = reply.into_array()?.into_iter();
        let (count, lowest, highest, consumers) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(count), Some(lowest), Some(highest), Some(consumers)) => {
                    (count, lowest, highest, consumers)
                }
                _ => return Err(ClientError::UnexpectedResponse),
            };

        let consumers = consumers
            .into_array()?
            .into_iter()
            .map(|entry| {
                let mut pair = entry.into_array()?.into_iter();
                match (pair.next(), pair.next()) {
                    (Some(name), Some(count)) => {
                        Ok((name.into_string()?, count.into_integer()?.max(0) as u64))
                    }
                    _ => Err(ClientError::UnexpectedResponse),
                }
            })
            .collect::<ClientResult<Vec<_>>>()?;

        Ok(PendingSummary {
            count: count.into_integer()?.max(0) as u64,
            lowest: optional_id(lowest)?,
            highest: optional_id(highest)?,
            consumers,
        })
    }

    /// True for a stream, false for a missing key, type mismatch otherwise.
    fn stream_exists(&self, stream: &str) -> ClientResult<bool> {
        let kind = self.call(&[b"TYPE", stream.as_bytes()])?.into_bytes()?;
        match kind.as_slice() {
            b"none" => Ok(false),
            b"stream" => Ok(true),
            other => Err(ClientError::TypeMismatch {
                message: format!(
                    "key '{stream}' holds a {} value, not a stream",
                    String::from_utf8_lossy(other)
                ),
            }),
        }
    }

    fn group_infos(&self, stream: &str) -> ClientResult<Vec<GroupInfo>> {
        self.call(&[b"XINFO", b"GROUPS", stream.as_bytes()])?
            .into_array()?
            .into_iter()
            .map(parse_group_info)
            .collect()
    }

    fn create_on_absent_stream(&self, stream: &str, group: &str) -> ClientResult<GroupCreation> {
        let outcome = match self.create_group(stream, group)? {
            true => GroupCreation::CreatedWithStream,
            false => GroupCreation::AlreadyExists,
        };
        debug!(stream, group, ?outcome, "ensured group on absent stream");
        Ok(outcome)
    }

    /// Returns false when the group turned out to exist already.
    fn create_group(&self, stream: &str, group: &str) -> ClientResult<bool> {
        let created = self.call_ok(&[
            b"XGROUP",
            b"CREATE",
            stream.as_bytes(),
            group.as_bytes(),
            GROUP_START_ID,
            b"MKSTREAM",
        ]);
        match created {
            Ok(()) => Ok(true),
            Err(err) if err.server_code() == Some(&b"BUSYGROUP"[..]) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Flattens `[[stream, entries], ...]` into one message list.
///
/// A null reply (nothing new, or a block that timed out) is empty.
fn flatten_read_reply(reply: RespValue) -> ClientResult<Vec<StreamMessage>> {
    let mut messages = Vec::new();
    for stream in reply.into_array()? {
        let mut parts = stream.into_array()?.into_iter();
        match (parts.next(), parts.next()) {
            (Some(_name), Some(entries)) => messages.extend(parse_entries(entries)?),
            _ => return Err(ClientError::UnexpectedResponse),
        }
    }
    Ok(messages)
}

fn parse_group_info(value: RespValue) -> ClientResult<GroupInfo> {
    let items = value.into_array()?;
    if items.len() % 2 != 0 {
        return Err(ClientError::UnexpectedResponse);
    }

    let mut name = None;
    let mut consumers = 0;
    let mut pending = 0;
    let mut last_delivered_id = MessageId::new(0, 0);

    let mut items = items.into_iter();
    while let (Some(key), Some(value)) = (items.next(), items.next()) {
        match key.into_bytes()?.as_slice() {
            b"name" => name = Some(value.into_string()?),
            b"consumers" => consumers = value.into_integer()?.max(0) as u64,
            b"pending" => pending = value.into_integer()?.max(0) as u64,
            b"last-delivered-id" => last_delivered_id = parse_id(value)?,
            // entries-read, lag and anything newer servers add.
            _ => {}
        }
    }

    Ok(GroupInfo {
        name: name.ok_or(ClientError::UnexpectedResponse)?,
        consumers,
        pending,
        last_delivered_id,
    })
}

fn optional_id(value: RespValue) -> ClientResult<Option<MessageId>> {
    match value {
        RespValue::Bulk(None) | RespValue::Null => Ok(None),
        other => parse_id(other).map(Some),
    }
}
