//! WAL record definitions and codec
//!
//! Defines a single log record and its on-disk encoding.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::DecodeError;

/// Bytes a frame adds around its payload: length (4) + checksum (4)
pub const FRAME_OVERHEAD: usize = 8;

/// Largest frame (overhead included) the log will write or accept
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Width of each length field inside a payload
const LEN_FIELD: usize = 4;

/// The operation a record performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Insert or overwrite a key
    Put,

    /// Remove a key
    Delete,
}

impl OpKind {
    /// Label stored in the payload's operation field
    pub fn label(self) -> &'static [u8] {
        match self {
            OpKind::Put => b"SET",
            OpKind::Delete => b"DELETE",
        }
    }

    fn from_label(label: &[u8]) -> Result<Self, DecodeError> {
        match label {
            b"SET" => Ok(OpKind::Put),
            b"DELETE" => Ok(OpKind::Delete),
            other => Err(DecodeError::UnknownOperation(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }
}

/// A single mutation, as written to the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub op: OpKind,
    pub key: Vec<u8>,
    /// New value for a put; the value being removed for a delete (may be empty)
    pub value: Vec<u8>,
}

impl LogRecord {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            op: OpKind::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>, previous: impl Into<Vec<u8>>) -> Self {
        Self {
            op: OpKind::Delete,
            key: key.into(),
            value: previous.into(),
        }
    }

    /// Size of the encoded payload
    pub fn payload_len(&self) -> usize {
        3 * LEN_FIELD + self.op.label().len() + self.key.len() + self.value.len()
    }

    /// Size of the full frame on disk
    pub fn frame_len(&self) -> usize {
        FRAME_OVERHEAD + self.payload_len()
    }

    /// Encode the payload:
    /// `[opLen][op][keyLen][key][valLen][value]`, little-endian u32 lengths
    pub fn encode_payload(&self) -> Bytes {
        let label = self.op.label();
        let mut buf = BytesMut::with_capacity(self.payload_len());

        buf.put_u32_le(label.len() as u32);
        buf.put_slice(label);
        buf.put_u32_le(self.key.len() as u32);
        buf.put_slice(&self.key);
        buf.put_u32_le(self.value.len() as u32);
        buf.put_slice(&self.value);

        buf.freeze()
    }

    /// Encode the full frame: `[length][payload][crc32(payload)]`
    ///
    /// The caller is responsible for keeping `frame_len()` within
    /// [`MAX_FRAME_SIZE`]; `Wal::append` checks this before encoding.
    pub fn encode_frame(&self) -> Bytes {
        let payload = self.encode_payload();
        let mut buf = BytesMut::with_capacity(FRAME_OVERHEAD + payload.len());

        buf.put_u32_le(payload.len() as u32);
        buf.put_slice(&payload);
        buf.put_u32_le(frame_checksum(&payload));

        buf.freeze()
    }

    /// Decode a payload. The buffer must hold exactly one record.
    pub fn decode_payload(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut buf = payload;

        let label = read_field(&mut buf, "operation")?;
        let op = OpKind::from_label(label)?;
        let key = read_field(&mut buf, "key")?.to_vec();
        let value = read_field(&mut buf, "value")?.to_vec();

        if buf.has_remaining() {
            return Err(DecodeError::TrailingBytes(buf.remaining()));
        }

        Ok(Self { op, key, value })
    }
}

/// CRC32 (IEEE) over a frame payload
pub fn frame_checksum(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}

/// Whether `prefix` can be the start of a payload whose frame declared
/// `declared` bytes
///
/// Used on a frame cut short by end of file: the fields that did make it to
/// disk must agree with the declared length, otherwise the length itself is
/// damaged and the frame is not a torn append.
pub(crate) fn is_plausible_partial_payload(declared: usize, prefix: &[u8]) -> bool {
    let mut rest = prefix;
    let mut total = 0usize;

    for field in 0..3 {
        if rest.len() < LEN_FIELD {
            return total + (3 - field) * LEN_FIELD <= declared;
        }
        let len = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        rest = &rest[LEN_FIELD..];

        total = match len.checked_add(LEN_FIELD).and_then(|n| total.checked_add(n)) {
            Some(total) if total <= declared => total,
            _ => return false,
        };

        let available = &rest[..len.min(rest.len())];
        if field == 0 && !is_label_prefix(len, available) {
            return false;
        }
        if rest.len() < len {
            return total + (2 - field) * LEN_FIELD <= declared;
        }
        rest = &rest[len..];
    }

    total == declared
}

fn is_label_prefix(len: usize, available: &[u8]) -> bool {
    [OpKind::Put, OpKind::Delete]
        .iter()
        .any(|op| op.label().len() == len && op.label().starts_with(available))
}

/// Read one `[u32 len][bytes]` field, advancing the buffer
fn read_field<'a>(buf: &mut &'a [u8], field: &'static str) -> Result<&'a [u8], DecodeError> {
    if buf.remaining() < LEN_FIELD {
        return Err(DecodeError::Truncated {
            field,
            needed: LEN_FIELD,
            remaining: buf.remaining(),
        });
    }

    let declared = buf.get_u32_le();
    let len = usize::try_from(declared).map_err(|_| DecodeError::Overflow {
        field,
        len: u64::from(declared),
    })?;

    if buf.remaining() < len {
        return Err(DecodeError::Truncated {
            field,
            needed: len,
            remaining: buf.remaining(),
        });
    }

    let slice: &'a [u8] = *buf;
    let (bytes, rest) = slice.split_at(len);
    *buf = rest;
    Ok(bytes)
}
