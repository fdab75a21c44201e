//! Recovery Module
//!
//! Rebuilds the table at startup.
//!
//! ## Steps
//! 1. Remove a temp snapshot left by an interrupted checkpoint
//! 2. Seed the table from the last published snapshot, if any
//! 3. Replay the WAL on top, in file order
//!
//! A checkpoint truncates the WAL right after publishing its snapshot, so
//! every record still in the log post-dates the snapshot. If that truncate
//! failed, the log repeats changes the snapshot already holds; replaying
//! them again lands on the same table.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::memtable::MemTable;
use crate::snapshot;
use crate::wal::{LogRecord, OpKind, Wal};

/// Summary of a completed recovery
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Whether a snapshot was found and loaded
    pub snapshot_loaded: bool,

    /// Pairs seeded from the snapshot
    pub snapshot_entries: u64,

    /// Put records replayed from the WAL
    pub puts_replayed: u64,

    /// Delete records replayed from the WAL
    pub deletes_replayed: u64,

    /// Bytes of a torn final frame cut off the WAL
    pub torn_tail_bytes: u64,

    /// Side file holding the cut-off bytes, if any were cut
    pub torn_tail_path: Option<PathBuf>,

    /// Whether a leftover temp snapshot was removed
    pub stale_tmp_removed: bool,
}

impl RecoveryReport {
    pub fn records_replayed(&self) -> u64 {
        self.puts_replayed + self.deletes_replayed
    }
}

/// Counts from one replay pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayCounts {
    pub puts: u64,
    pub deletes: u64,
}

/// Apply records to a table in order: put upserts, delete removes
pub fn replay<I>(table: &mut MemTable, records: I) -> ReplayCounts
where
    I: IntoIterator<Item = LogRecord>,
{
    let mut counts = ReplayCounts::default();
    for record in records {
        match record.op {
            OpKind::Put => counts.puts += 1,
            OpKind::Delete => counts.deletes += 1,
        }
        table.apply(record);
    }
    counts
}

/// Rebuild the table from `snapshot_path` plus the WAL
///
/// Any error aborts the whole recovery; no partial table is returned.
pub fn recover(
    wal: &Wal,
    snapshot_path: &Path,
    snapshot_tmp_path: &Path,
) -> Result<(MemTable, RecoveryReport)> {
    let mut report = RecoveryReport::default();

    match fs::remove_file(snapshot_tmp_path) {
        Ok(()) => {
            warn!(path = %snapshot_tmp_path.display(), "removed unpublished snapshot from interrupted checkpoint");
            report.stale_tmp_removed = true;
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let mut table = match snapshot::load(snapshot_path)? {
        Some(table) => {
            report.snapshot_loaded = true;
            report.snapshot_entries = table.len() as u64;
            table
        }
        None => MemTable::new(),
    };

    let scan = wal.scan()?;
    report.torn_tail_bytes = scan.torn_tail_bytes;
    report.torn_tail_path = scan.torn_tail_path;

    let counts = replay(&mut table, scan.records);
    report.puts_replayed = counts.puts;
    report.deletes_replayed = counts.deletes;

    info!(
        snapshot_entries = report.snapshot_entries,
        puts = report.puts_replayed,
        deletes = report.deletes_replayed,
        torn_tail_bytes = report.torn_tail_bytes,
        live_keys = table.len(),
        "recovery complete"
    );

    Ok((table, report))
}
