//! Checkpoint Module
//!
//! Snapshot-then-truncate. The caller holds the store's exclusive lock for
//! the whole call, so no mutation can land between the snapshot and the
//! truncate.

use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::memtable::MemTable;
use crate::snapshot;
use crate::wal::Wal;

/// What a checkpoint did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointStats {
    /// Pairs written to the snapshot
    pub entries: u64,

    /// Size of the new snapshot file
    pub snapshot_bytes: u64,

    /// WAL bytes dropped by the truncate
    pub wal_bytes_reclaimed: u64,
}

/// Publish a snapshot of `table`, then truncate `wal`
///
/// The WAL is only touched once the snapshot is durable and renamed into
/// place. If the snapshot fails, the WAL and the previous snapshot are left
/// as they were.
pub(crate) fn run(table: &MemTable, wal: &Wal, config: &Config) -> Result<CheckpointStats> {
    let wal_bytes = wal.len();

    let written = snapshot::write_atomic(&config.snapshot_path(), &config.snapshot_tmp_path(), table)?;
    wal.truncate()?;

    let stats = CheckpointStats {
        entries: written.entries,
        snapshot_bytes: written.bytes,
        wal_bytes_reclaimed: wal_bytes,
    };
    info!(
        entries = stats.entries,
        snapshot_bytes = stats.snapshot_bytes,
        wal_bytes_reclaimed = stats.wal_bytes_reclaimed,
        "checkpoint complete"
    );

    Ok(stats)
}
