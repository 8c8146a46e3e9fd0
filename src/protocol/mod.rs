//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Request Format (text, one command per line)
//! ```text
//! <verb> [arg ...]\n          (a trailing \r before \n is tolerated)
//! ```
//! Tokens are separated by ASCII whitespace. Arguments are delimited, not
//! length-prefixed, so they cannot contain whitespace.
//!
//! ### Commands
//! - `get <key>`            → bulk value or nil
//! - `set <key> <value>`    → `:1`
//! - `del <key> [key ...]`  → `:<removed>`
//! - `ping`                 → bulk `PONG`
//! - `quit`                 → bulk `OK`, then the server closes the connection
//!
//! ## Reply Format (RESP-style, one reply per frame)
//! ```text
//! $<len>\r\n<len bytes>\r\n   bulk string
//! $-1\r\n                     nil
//! :<integer>\r\n              integer
//! -<message>\r\n              error
//! ```

mod command;
mod reply;
mod codec;

pub use command::{Arity, Command, Verb};
pub use reply::Reply;
pub use codec::{
    decode_command, decode_reply, encode_command, encode_reply, read_command, read_reply,
    write_command, write_reply, MAX_BULK_LEN,
};
