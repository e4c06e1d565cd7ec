//! # RESP2 Encoding and Parsing
//!
//! Purpose: Encode client commands and parse server replies, including the
//! nested arrays returned by SCAN, XINFO and XREADGROUP.
//!
//! ## Design Principles
//! 1. **State-Free Parsing**: Replies are parsed top-down with minimal state.
//! 2. **Buffer Reuse**: Caller provides buffers to avoid per-call allocations.
//! 3. **Binary-Safe**: Bulk strings are treated as raw bytes.
//! 4. **Null Is Structural**: `$-1` and `*-1` are kept apart from empty values.

use std::io::BufRead;

use crate::error::{ClientError, ClientResult};

/// Largest bulk string the store will ever send (its 512 MiB value limit).
const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Upper bound on slots reserved up front for an array reply.
const MAX_ARRAY_PREALLOC: usize = 1024;

/// RESP reply value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// +OK or +PONG style replies.
    Simple(Vec<u8>),
    /// -ERR ... replies.
    Error(Vec<u8>),
    /// :123 replies.
    Integer(i64),
    /// $... bulk strings, with None for null.
    Bulk(Option<Vec<u8>>),
    /// *... arrays.
    Array(Vec<RespValue>),
    /// *-1, e.g. a blocking read that timed out.
    Null,
}

impl RespValue {
    /// Returns the payload of a simple or non-null bulk string.
    pub fn into_bytes(self) -> ClientResult<Vec<u8>> {
        match self {
            RespValue::Simple(data) | RespValue::Bulk(Some(data)) => Ok(data),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Like `into_bytes`, additionally requiring valid UTF-8.
    pub fn into_string(self) -> ClientResult<String> {
        String::from_utf8(self.into_bytes()?).map_err(|_| ClientError::Protocol)
    }

    /// Returns the elements of an array; a null array is empty.
    pub fn into_array(self) -> ClientResult<Vec<RespValue>> {
        match self {
            RespValue::Array(items) => Ok(items),
            RespValue::Null => Ok(Vec::new()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Reads an integer reply, accepting the decimal bulk form some commands use.
    pub fn into_integer(self) -> ClientResult<i64> {
        match self {
            RespValue::Integer(value) => Ok(value),
            RespValue::Bulk(Some(data)) | RespValue::Simple(data) => parse_i64(&data),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

/// Encodes a RESP2 array command into the provided buffer.
pub fn encode_command(args: &[&[u8]], out: &mut Vec<u8>) {
    out.push(b'*');
    push_usize(out, args.len());
    out.extend_from_slice(b"\r\n");
    for arg in args {
        out.push(b'$');
        push_usize(out, arg.len());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
}

/// Reads one RESP value from the buffered reader.
pub fn read_response<R: BufRead>(reader: &mut R, line_buf: &mut Vec<u8>) -> ClientResult<RespValue> {
    read_line(reader, line_buf)?;
    if line_buf.is_empty() {
        return Err(ClientError::Protocol);
    }

    match line_buf[0] {
        b'+' => Ok(RespValue::Simple(line_buf[1..].to_vec())),
        b'-' => Ok(RespValue::Error(line_buf[1..].to_vec())),
        b':' => Ok(RespValue::Integer(parse_i64(&line_buf[1..])?)),
        b'$' => {
            let len = parse_i64(&line_buf[1..])?;
            parse_bulk_len(reader, len, line_buf)
        }
        b'*' => {
            let len = parse_i64(&line_buf[1..])?;
            parse_array_len(reader, len, line_buf)
        }
        _ => Err(ClientError::Protocol),
    }
}

fn parse_bulk_len<R: BufRead>(
    reader: &mut R,
    len: i64,
    line_buf: &mut Vec<u8>,
) -> ClientResult<RespValue> {
    if len < 0 {
        return Ok(RespValue::Bulk(None));
    }
    if len > MAX_BULK_LEN {
        return Err(ClientError::Protocol);
    }
    let len = len as usize;
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data)?;

    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf)?;
    if crlf != [b'\r', b'\n'] {
        return Err(ClientError::Protocol);
    }

    line_buf.clear();
    Ok(RespValue::Bulk(Some(data)))
}

fn parse_array_len<R: BufRead>(
    reader: &mut R,
    len: i64,
    line_buf: &mut Vec<u8>,
) -> ClientResult<RespValue> {
    if len < 0 {
        return Ok(RespValue::Null);
    }
    if len == 0 {
        return Ok(RespValue::Array(Vec::new()));
    }

    // The count comes off the wire; grow past the cap only as items arrive.
    let prealloc = usize::try_from(len).unwrap_or(usize::MAX).min(MAX_ARRAY_PREALLOC);
    let mut items = Vec::with_capacity(prealloc);
    for _ in 0..len {
        items.push(read_response(reader, line_buf)?);
    }
    Ok(RespValue::Array(items))
}

fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> ClientResult<()> {
    buf.clear();
    let bytes = reader.read_until(b'\n', buf)?;
    if bytes == 0 {
        return Err(ClientError::Protocol);
    }
    if buf.len() < 2 || buf[buf.len() - 2] != b'\r' {
        return Err(ClientError::Protocol);
    }
    buf.truncate(buf.len() - 2);
    Ok(())
}

pub(crate) fn parse_i64(data: &[u8]) -> ClientResult<i64> {
    if data.is_empty() {
        return Err(ClientError::Protocol);
    }
    let mut negative = false;
    let mut idx = 0;
    if data[0] == b'-' {
        negative = true;
        idx = 1;
    }
    if idx == data.len() {
        return Err(ClientError::Protocol);
    }

    let mut value: i64 = 0;
    while idx < data.len() {
        let b = data[idx];
        if !b.is_ascii_digit() {
            return Err(ClientError::Protocol);
        }
        value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
        idx += 1;
    }

    if negative {
        Ok(-value)
    } else {
        Ok(value)
    }
}

fn push_usize(out: &mut Vec<u8>, mut value: usize) {
    // Write digits into a small stack buffer to avoid heap allocations.
    let mut buf = [0u8; 20];
    let mut len = 0;
    if value == 0 {
        buf[0] = b'0';
        len = 1;
    } else {
        while value > 0 {
            buf[len] = b'0' + (value % 10) as u8;
            value /= 10;
            len += 1;
        }
    }
    for idx in (0..len).rev() {
        out.push(buf[idx]);
    }
}
