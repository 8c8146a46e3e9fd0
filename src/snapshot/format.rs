//! Snapshot entry encoding
//!
//! Repeated `(key_len: u64 LE, key, value_len: u64 LE, value)` records.

use std::io::Write;

use bytes::{Buf, Bytes};

use crate::error::Result;
use crate::store::Value;

const LEN_SIZE: usize = 8;

/// Entries recovered from snapshot bytes
#[derive(Debug, Default)]
pub struct DecodedEntries {
    /// Every record decoded before the end of data (or the corruption point)
    pub entries: Vec<(Vec<u8>, Value)>,

    /// Set when decoding stopped at a malformed or truncated record
    pub corruption: Option<String>,
}

/// Write entries to `writer`, returning the number of bytes written
pub fn encode_entries<'a, W, I>(writer: &mut W, entries: I) -> Result<u64>
where
    W: Write,
    I: IntoIterator<Item = (&'a [u8], &'a Value)>,
{
    let mut written = 0u64;
    for (key, value) in entries {
        let value = value.as_bytes();
        writer.write_all(&(key.len() as u64).to_le_bytes())?;
        writer.write_all(key)?;
        writer.write_all(&(value.len() as u64).to_le_bytes())?;
        writer.write_all(value)?;
        written += (2 * LEN_SIZE + key.len() + value.len()) as u64;
    }
    Ok(written)
}

/// Decode every record in `data`.
///
/// Values are zero-copy slices of `data`. Decoding stops at the first record
/// whose length prefix or payload runs past the end of the buffer.
pub fn decode_entries(mut data: Bytes) -> DecodedEntries {
    let mut decoded = DecodedEntries::default();
    let total = data.len();

    while data.has_remaining() {
        let record_start = total - data.remaining();

        let key = match take_field(&mut data) {
            Some(key) => key,
            None => {
                decoded.corruption = Some(format!("truncated key at byte {}", record_start));
                break;
            }
        };
        let value = match take_field(&mut data) {
            Some(value) => value,
            None => {
                decoded.corruption = Some(format!("truncated value at byte {}", record_start));
                break;
            }
        };

        decoded.entries.push((key.to_vec(), Value::String(value)));
    }

    decoded
}

fn take_field(data: &mut Bytes) -> Option<Bytes> {
    if data.remaining() < LEN_SIZE {
        return None;
    }
    let len = data.get_u64_le();
    if len > data.remaining() as u64 {
        return None;
    }
    Some(data.split_to(len as usize))
}
