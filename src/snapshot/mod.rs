//! Snapshot Module
//!
//! Point-in-time dump of the table, written by a checkpoint and read back by
//! recovery.
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ Header (20 bytes, bincode fixint LE)        │
//! │ magic (8) | version (4) | entry_count (8)   │
//! ├────────────────────────────────────────────┤
//! │ entry_count WAL frames, each a SET record   │
//! │ [Len (4)][Payload][CRC (4)]                 │
//! └────────────────────────────────────────────┘
//! ```
//! Entries use the same framing as the log, so keys and values are
//! arbitrary bytes. The file ends exactly after the last frame.

mod reader;
mod writer;

use serde::{Deserialize, Serialize};

use crate::error::{KvError, Result};

pub use reader::load;
pub use writer::write_atomic;

/// Magic bytes identifying a snapshot file
pub const MAGIC: [u8; 8] = *b"WALKVSNP";

/// Current snapshot format version
pub const VERSION: u32 = 1;

/// Encoded header size: magic (8) + version (4) + entry_count (8)
pub const HEADER_SIZE: usize = 20;

/// Fixed-size header at the start of every snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SnapshotHeader {
    magic: [u8; 8],
    version: u32,
    entry_count: u64,
}

impl SnapshotHeader {
    fn new(entry_count: u64) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            entry_count,
        }
    }

    fn check(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(KvError::Snapshot(format!(
                "bad magic {:02x?}",
                self.magic
            )));
        }
        if self.version != VERSION {
            return Err(KvError::Snapshot(format!(
                "unsupported version {} (expected {})",
                self.version, VERSION
            )));
        }
        Ok(())
    }
}

/// What a snapshot write produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotInfo {
    /// Number of key/value pairs written
    pub entries: u64,

    /// Total file size in bytes
    pub bytes: u64,
}
