//! # Client Errors
//!
//! Purpose: One error type for every operation, with a coarse `ErrorKind`
//! callers can branch on without inspecting server text.
//!
//! ## Design Principles
//! 1. **Classify Once**: Server error replies are mapped to variants in a single
//!    place (`ClientError::from_reply`), keyed on the leading error code.
//! 2. **Absence Is Not Success**: Missing keys, fields and groups surface as
//!    the `NotFound` kind rather than an empty value.
//! 3. **Only Init Is Fatal**: `FatalInit` is produced by `StoreClient::initialize`
//!    and nowhere else.

use thiserror::Error;

/// Result type for the client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or IO failure while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// RESP2 framing or parse error.
    #[error("protocol error")]
    Protocol,
    /// Server returned an error reply that has no dedicated variant.
    #[error("server error: {}", String::from_utf8_lossy(.message))]
    Server { message: Vec<u8> },
    /// Response type did not match the expected command response.
    #[error("unexpected response")]
    UnexpectedResponse,
    /// Every pooled connection stayed busy for the whole acquisition timeout.
    #[error("connection pool exhausted")]
    PoolExhausted,
    /// Address could not be resolved into a socket address.
    #[error("invalid address")]
    InvalidAddress,
    /// Key, field or message is absent.
    #[error("not found")]
    NotFound,
    /// The consumer group (or the stream backing it) does not exist.
    #[error("no such consumer group: {message}")]
    NoGroup { message: String },
    /// Operation applied to the wrong kind of value.
    #[error("type mismatch: {message}")]
    TypeMismatch { message: String },
    /// Caller supplied an argument the store cannot honour.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Startup liveness check failed.
    #[error("liveness check failed: {source}")]
    FatalInit {
        #[source]
        source: Box<ClientError>,
    },
}

/// Coarse classification of a `ClientError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    TypeMismatch,
    Unavailable,
    Protocol,
    FatalInit,
    Server,
    InvalidArgument,
}

impl ClientError {
    /// Converts a RESP error reply into the matching variant.
    pub(crate) fn from_reply(message: Vec<u8>) -> Self {
        match error_code(&message) {
            b"WRONGTYPE" => ClientError::TypeMismatch {
                message: String::from_utf8_lossy(&message).into_owned(),
            },
            b"NOGROUP" => ClientError::NoGroup {
                message: String::from_utf8_lossy(&message).into_owned(),
            },
            // INCR/INCRBY on a non-integer value only carries the generic ERR code.
            b"ERR" if message.ends_with(b"not an integer or out of range") => {
                ClientError::TypeMismatch {
                    message: String::from_utf8_lossy(&message).into_owned(),
                }
            }
            _ => ClientError::Server { message },
        }
    }

    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::NotFound | ClientError::NoGroup { .. } => ErrorKind::NotFound,
            ClientError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ClientError::Io(_) | ClientError::PoolExhausted | ClientError::InvalidAddress => {
                ErrorKind::Unavailable
            }
            ClientError::Protocol | ClientError::UnexpectedResponse => ErrorKind::Protocol,
            ClientError::FatalInit { .. } => ErrorKind::FatalInit,
            ClientError::Server { .. } => ErrorKind::Server,
            ClientError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    /// Returns true when the error reports an absent key, field or group.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns the leading error code of a generic server reply, e.g. `BUSYGROUP`.
    pub fn server_code(&self) -> Option<&[u8]> {
        match self {
            ClientError::Server { message } => Some(error_code(message)),
            _ => None,
        }
    }
}

/// The error code is the first space-delimited word of an error reply.
fn error_code(message: &[u8]) -> &[u8] {
    let end = message
        .iter()
        .position(|&b| b == b' ')
        .unwrap_or(message.len());
    &message[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_wrongtype_reply() {
        let err = ClientError::from_reply(
            b"WRONGTYPE Operation against a key holding the wrong kind of value".to_vec(),
        );
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn classifies_incr_on_text_as_type_mismatch() {
        let err = ClientError::from_reply(b"ERR value is not an integer or out of range".to_vec());
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn classifies_nogroup_as_not_found() {
        let err = ClientError::from_reply(
            b"NOGROUP No such key 'orders' or consumer group 'workers'".to_vec(),
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn exposes_busygroup_code() {
        let err = ClientError::from_reply(b"BUSYGROUP Consumer Group name already exists".to_vec());
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.server_code(), Some(&b"BUSYGROUP"[..]));
    }

    #[test]
    fn io_and_pool_errors_are_unavailable() {
        let io = ClientError::from(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
        assert_eq!(io.kind(), ErrorKind::Unavailable);
        assert_eq!(ClientError::PoolExhausted.kind(), ErrorKind::Unavailable);
    }

    #[test]
    fn fatal_init_wraps_source() {
        let err = ClientError::FatalInit {
            source: Box::new(ClientError::PoolExhausted),
        };
        assert_eq!(err.kind(), ErrorKind::FatalInit);
        assert!(err.to_string().contains("connection pool exhausted"));
    }
}
