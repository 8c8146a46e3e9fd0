//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! Commands travel as newline-terminated text lines; replies as RESP-style
//! frames. Every decoding failure surfaces as `VeroError::Protocol`, after
//! which the stream position cannot be trusted and the connection must close.

use std::io::{BufRead, Cursor, ErrorKind, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use super::reply::sanitize;
use super::{Command, Reply, Verb};
use crate::error::{Result, VeroError};

/// Largest bulk payload a reply decoder accepts (16 MB)
pub const MAX_BULK_LEN: usize = 16 * 1024 * 1024;

/// Longest reply header line (`$<len>`, `:<int>`, `-<message>`)
const MAX_HEADER_LEN: usize = 64 * 1024;

const CRLF: &[u8] = b"\r\n";

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command as a request line, terminator included
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut line = command.to_line();
    line.push(b'\n');
    line
}

/// Decode one request line (terminator already stripped).
///
/// Never fails: an empty line or an unrecognized first token yields
/// `Verb::Unknown`, which the interpreter turns into an error reply.
pub fn decode_command(line: &[u8]) -> Command {
    let mut tokens = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty());

    let verb = match tokens.next() {
        Some(token) => Verb::parse(token),
        None => Verb::Unknown(String::new()),
    };
    let args = tokens.map(Bytes::copy_from_slice).collect();

    Command::new(verb, args)
}

/// Read the next command from a stream
///
/// Returns `Ok(None)` on a clean end of stream (no partial frame buffered).
pub fn read_command<R: BufRead>(reader: &mut R, max_len: usize) -> Result<Option<Command>> {
    let mut line = Vec::new();
    if !read_line(reader, max_len, &mut line)? {
        return Ok(None);
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(decode_command(&line)))
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

/// Encode a reply frame
///
/// A bulk frame's declared length is always the payload's byte length.
pub fn encode_reply(reply: &Reply) -> BytesMut {
    let mut buf = BytesMut::new();
    match reply {
        Reply::Bulk(data) => {
            let len = data.len().to_string();
            buf.reserve(1 + len.len() + 2 + data.len() + 2);
            buf.put_u8(b'$');
            buf.put_slice(len.as_bytes());
            buf.put_slice(CRLF);
            buf.put_slice(data);
            buf.put_slice(CRLF);
        }
        Reply::Nil => buf.put_slice(b"$-1\r\n"),
        Reply::Integer(n) => {
            buf.put_u8(b':');
            buf.put_slice(n.to_string().as_bytes());
            buf.put_slice(CRLF);
        }
        Reply::Error(message) => {
            let message = sanitize(message.clone());
            buf.put_u8(b'-');
            buf.put_slice(message.as_bytes());
            buf.put_slice(CRLF);
        }
    }
    buf
}

/// Decode one reply frame from the front of `bytes`
///
/// Returns the reply and the number of bytes consumed. An empty or truncated
/// buffer is a protocol error.
pub fn decode_reply(bytes: &[u8]) -> Result<(Reply, usize)> {
    let mut cursor = Cursor::new(bytes);
    match read_reply(&mut cursor)? {
        Some(reply) => Ok((reply, cursor.position() as usize)),
        None => Err(VeroError::Protocol("empty reply frame".to_string())),
    }
}

/// Read the next reply from a stream
///
/// Returns `Ok(None)` when the peer closed the stream between frames.
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Option<Reply>> {
    let mut header = Vec::new();
    if !read_line(reader, MAX_HEADER_LEN, &mut header)? {
        return Ok(None);
    }
    if header.pop() != Some(b'\r') {
        return Err(VeroError::Protocol(
            "reply header not terminated by CRLF".to_string(),
        ));
    }

    let (&kind, body) = header
        .split_first()
        .ok_or_else(|| VeroError::Protocol("empty reply header".to_string()))?;

    let reply = match kind {
        b'$' => {
            let len = parse_integer(body, "bulk length")?;
            match len {
                -1 => Reply::Nil,
                n if n < 0 => {
                    return Err(VeroError::Protocol(format!("negative bulk length {}", n)));
                }
                n => read_bulk(reader, n as u64)?,
            }
        }
        b':' => Reply::Integer(parse_integer(body, "integer")?),
        b'-' => Reply::Error(String::from_utf8_lossy(body).into_owned()),
        other => {
            return Err(VeroError::Protocol(format!(
                "unknown reply type byte 0x{:02x}",
                other
            )))
        }
    };

    Ok(Some(reply))
}

/// Write a reply to a stream
pub fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> Result<()> {
    writer.write_all(&encode_reply(reply))?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

/// Read up to and including `\n`, bounded by `max_len` bytes.
///
/// Returns `Ok(false)` on end of stream with nothing read. The terminator is
/// stripped from `buf`.
fn read_line<R: BufRead>(reader: &mut R, max_len: usize, buf: &mut Vec<u8>) -> Result<bool> {
    buf.clear();
    let read = reader.by_ref().take(max_len as u64).read_until(b'\n', buf)?;
    if read == 0 {
        return Ok(false);
    }

    if buf.last() != Some(&b'\n') {
        return Err(if read >= max_len {
            VeroError::Protocol(format!("frame exceeds {} bytes", max_len))
        } else {
            VeroError::Protocol("frame truncated before line terminator".to_string())
        });
    }

    buf.pop();
    Ok(true)
}

fn parse_integer(digits: &[u8], what: &str) -> Result<i64> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            VeroError::Protocol(format!(
                "malformed {}: {:?}",
                what,
                String::from_utf8_lossy(digits)
            ))
        })
}

fn read_bulk<R: Read>(reader: &mut R, len: u64) -> Result<Reply> {
    if len > MAX_BULK_LEN as u64 {
        return Err(VeroError::Protocol(format!(
            "bulk length {} exceeds maximum {}",
            len, MAX_BULK_LEN
        )));
    }

    let mut payload = vec![0u8; len as usize + CRLF.len()];
    reader.read_exact(&mut payload).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => VeroError::Protocol(format!(
            "bulk payload truncated (expected {} bytes)",
            len
        )),
        _ => VeroError::Io(e),
    })?;

    if !payload.ends_with(CRLF) {
        return Err(VeroError::Protocol(
            "bulk payload not terminated by CRLF".to_string(),
        ));
    }
    payload.truncate(len as usize);
    Ok(Reply::Bulk(Bytes::from(payload)))
}
