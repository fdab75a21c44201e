//! # walkv
//!
//! A durable, single-process key-value store with:
//! - Write-Ahead Logging (WAL) with CRC32-checked frames
//! - Crash recovery from snapshot + WAL replay, tolerating a torn tail
//! - Checkpointing to bound WAL growth
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Store                               │
//! │            (RwLock: single writer / multi reader)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │  MemTable   │
//!   │  (Append)   │          │  (HashMap)  │
//!   └──────┬──────┘          └──────┬──────┘
//!          │   truncate              │ dump
//!          └──────── Checkpoint ─────┘
//!                        │
//!                        ▼
//!                 ┌─────────────┐
//!                 │  Snapshot   │
//!                 └─────────────┘
//! ```
//!
//! ```no_run
//! use walkv::Store;
//!
//! # fn main() -> walkv::Result<()> {
//! let store = Store::open_path(std::path::Path::new("./data"))?;
//! store.set(b"k1", b"v1")?;
//! assert_eq!(store.get(b"k1"), Some(b"v1".to_vec()));
//! store.checkpoint()?;
//! store.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod memtable;
pub mod snapshot;
pub mod recovery;
pub mod checkpoint;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use checkpoint::CheckpointStats;
pub use config::{Config, WalSyncStrategy};
pub use error::{DecodeError, ErrorKind, KvError, Result};
pub use recovery::RecoveryReport;
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of walkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
