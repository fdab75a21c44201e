//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append a record before the matching mutation becomes visible
//! - CRC32 checksums for corruption detection
//! - Ordered replay for crash recovery
//! - Truncation once a checkpoint has made the log redundant
//!
//! ## File Format
//! All integers are little-endian u32.
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Frame 1                                                  │
//! │ ┌─────────┬──────────────────────────────────┬─────────┐ │
//! │ │ Len (4) │ Payload (Len bytes)              │ CRC (4) │ │
//! │ └─────────┴──────────────────────────────────┴─────────┘ │
//! ├──────────────────────────────────────────────────────────┤
//! │ Frame 2 ...                                              │
//! └──────────────────────────────────────────────────────────┘
//!
//! Payload:
//! ┌───────────┬────┬────────────┬─────┬────────────┬───────┐
//! │ OpLen (4) │ Op │ KeyLen (4) │ Key │ ValLen (4) │ Value │
//! └───────────┴────┴────────────┴─────┴────────────┴───────┘
//! ```
//! The CRC covers the payload only. `Op` is `SET` or `DELETE`.

mod entry;
mod reader;
mod writer;

pub use entry::{frame_checksum, LogRecord, OpKind, FRAME_OVERHEAD, MAX_FRAME_SIZE};
pub use reader::{decode_frame, scan_records, verify, FrameRead, FrameReader, VerifyReport, WalScan};
pub use writer::Wal;
