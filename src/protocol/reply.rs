//! Reply definitions
//!
//! Represents replies to clients.

use std::fmt;

use bytes::Bytes;

/// A reply to send to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Byte string payload
    Bulk(Bytes),

    /// Key not found
    Nil,

    /// Signed integer (e.g. count of removed keys)
    Integer(i64),

    /// Error message, must not contain CR or LF
    Error(String),
}

impl Reply {
    /// Bulk `OK`
    pub fn ok() -> Self {
        Reply::Bulk(Bytes::from_static(b"OK"))
    }

    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::Bulk(data.into())
    }

    /// Error reply with CR/LF replaced by spaces
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(sanitize(message.into()))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

pub(crate) fn sanitize(message: String) -> String {
    if message.contains(['\r', '\n']) {
        message.replace(['\r', '\n'], " ")
    } else {
        message
    }
}

/// Interactive client rendering: `"<string>"`, `(integer) <n>`, `(nil)`, raw error
impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Bulk(data) => write!(f, "\"{}\"", String::from_utf8_lossy(data)),
            Reply::Nil => write!(f, "(nil)"),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::Error(message) => write!(f, "{}", message),
        }
    }
}
