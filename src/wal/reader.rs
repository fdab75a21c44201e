//! WAL Reader
//!
//! Sequential frame scanning over any byte stream. Used for WAL replay,
//! snapshot loading and offline verification.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use crate::error::{KvError, Result};

use super::entry::{
    frame_checksum, is_plausible_partial_payload, LogRecord, OpKind, FRAME_OVERHEAD, MAX_FRAME_SIZE,
};

/// Outcome of reading one frame
#[derive(Debug, PartialEq, Eq)]
pub enum FrameRead {
    /// A complete frame whose checksum matched
    Frame { offset: u64, payload: Vec<u8> },

    /// Clean end of stream on a frame boundary
    End,

    /// The stream ended inside a frame (crash mid-append)
    TornTail { offset: u64, bytes: u64 },
}

/// Reads checksummed frames one at a time
pub struct FrameReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_offset(inner, 0)
    }

    /// Start reading at a known stream position (used for error offsets)
    pub fn with_offset(inner: R, offset: u64) -> Self {
        Self { inner, offset }
    }

    /// Position just past the last complete frame
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the next frame, verifying its checksum
    ///
    /// A checksum mismatch or an impossible length is an error; a short read
    /// is reported as [`FrameRead::TornTail`] so the caller can decide
    /// whether it is tolerable. A short read is only a torn tail when the
    /// bytes that are present agree with the declared length, or when
    /// everything from here on is zero; anything else means the length
    /// field is damaged.
    pub fn next_frame(&mut self) -> Result<FrameRead> {
        let start = self.offset;

        let mut len_buf = [0u8; 4];
        let got = read_full(&mut self.inner, &mut len_buf)?;
        if got == 0 {
            return Ok(FrameRead::End);
        }
        if got < len_buf.len() {
            return Ok(FrameRead::TornTail {
                offset: start,
                bytes: got as u64,
            });
        }

        let len = u32::from_le_bytes(len_buf) as usize;
        if len == 0 {
            return self.zero_filled_tail(start);
        }
        if len > MAX_FRAME_SIZE - FRAME_OVERHEAD {
            return Err(KvError::FrameTooLarge {
                offset: start,
                len: len as u64,
            });
        }

        // payload + trailing checksum
        let mut body = vec![0u8; len + 4];
        let got = read_full(&mut self.inner, &mut body)?;
        if got < body.len() {
            if !is_plausible_partial_payload(len, &body[..got.min(len)]) {
                return Err(KvError::LengthMismatch {
                    offset: start,
                    declared: len as u64,
                });
            }
            return Ok(FrameRead::TornTail {
                offset: start,
                bytes: (len_buf.len() + got) as u64,
            });
        }

        let mut crc_buf = [0u8; 4];
        crc_buf.copy_from_slice(&body[len..]);
        let stored = u32::from_le_bytes(crc_buf);
        body.truncate(len);

        let computed = frame_checksum(&body);
        if stored != computed {
            return Err(KvError::Corruption {
                offset: start,
                stored,
                computed,
            });
        }

        self.offset += (len + FRAME_OVERHEAD) as u64;
        Ok(FrameRead::Frame {
            offset: start,
            payload: body,
        })
    }

    /// No record has an empty payload, so a zero length is only accepted as
    /// the start of a zero-filled tail (space the file system allocated for
    /// an append that never landed).
    fn zero_filled_tail(&mut self, start: u64) -> Result<FrameRead> {
        let mut rest = Vec::new();
        self.inner.read_to_end(&mut rest)?;
        if rest.iter().any(|&b| b != 0) {
            return Err(KvError::LengthMismatch {
                offset: start,
                declared: 0,
            });
        }
        Ok(FrameRead::TornTail {
            offset: start,
            bytes: (4 + rest.len()) as u64,
        })
    }
}

/// Decode a verified frame payload into a record
pub fn decode_frame(offset: u64, payload: &[u8]) -> Result<LogRecord> {
    LogRecord::decode_payload(payload).map_err(|source| KvError::DataIntegrity { offset, source })
}

/// Everything a full log scan found
#[derive(Debug, Default)]
pub struct WalScan {
    /// Records in file order
    pub records: Vec<LogRecord>,

    /// Length of the prefix made of complete, valid frames
    pub valid_len: u64,

    /// Bytes of an incomplete final frame (0 if the log ended cleanly)
    pub torn_tail_bytes: u64,

    /// Where the discarded bytes were kept, when a `Wal` cut them off
    pub torn_tail_path: Option<PathBuf>,
}

/// Decode every frame in a stream, failing closed on corruption
pub fn scan_records<R: Read>(reader: R) -> Result<WalScan> {
    let mut frames = FrameReader::new(reader);
    let mut scan = WalScan::default();

    loop {
        match frames.next_frame()? {
            FrameRead::Frame { offset, payload } => {
                scan.records.push(decode_frame(offset, &payload)?);
            }
            FrameRead::End => break,
            FrameRead::TornTail { bytes, .. } => {
                scan.torn_tail_bytes = bytes;
                break;
            }
        }
    }

    scan.valid_len = frames.offset();
    Ok(scan)
}

/// Result of inspecting a WAL file without modifying it
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Number of complete, valid frames
    pub frames: u64,

    pub puts: u64,

    pub deletes: u64,

    /// Length of the valid prefix
    pub valid_bytes: u64,

    /// Bytes of an incomplete final frame
    pub torn_tail_bytes: u64,
}

impl VerifyReport {
    /// Whether a replay would cut a torn tail off the file
    pub fn was_truncated(&self) -> bool {
        self.torn_tail_bytes > 0
    }
}

/// Verify integrity of a WAL file without modifying it
///
/// Fails with the same errors a replay would: corruption aborts, a torn
/// tail is only reported.
pub fn verify(path: &Path) -> Result<VerifyReport> {
    let file = File::open(path)?;
    let scan = scan_records(BufReader::new(file))?;

    let mut report = VerifyReport {
        frames: scan.records.len() as u64,
        valid_bytes: scan.valid_len,
        torn_tail_bytes: scan.torn_tail_bytes,
        ..VerifyReport::default()
    };
    for record in &scan.records {
        match record.op {
            OpKind::Put => report.puts += 1,
            OpKind::Delete => report.deletes += 1,
        }
    }

    Ok(report)
}

/// Fill `buf` as far as the stream allows; returns the bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
