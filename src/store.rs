//! Store Module
//!
//! The key-value store that coordinates the WAL, the table and checkpoints.
//!
//! ## Responsibilities
//! - Log every mutation before it becomes visible
//! - Handle concurrent read/write access
//! - Checkpoint on request or once the WAL passes a configured size
//! - Run crash recovery on open

use std::fs;
use std::path::Path;

use parking_lot::RwLock;
use tracing::error;

use crate::checkpoint::{self, CheckpointStats};
use crate::config::Config;
use crate::error::Result;
use crate::memtable::MemTable;
use crate::recovery::{self, RecoveryReport};
use crate::wal::{LogRecord, Wal};

/// A durable key-value store
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (set/delete/checkpoint): take the table's write lock and
///   hold it across the WAL append and the table mutation (or across the
///   snapshot and the truncate). Writers are fully serialized against each
///   other and against readers.
///
/// - **Reads** (get/size): take the read lock only and never touch the WAL.
///   A read racing a write sees either the old or the new value.
pub struct Store {
    /// Store configuration
    config: Config,

    /// Write-ahead log; appends only happen under the table's write lock
    wal: Wal,

    /// Live keys
    table: RwLock<MemTable>,

    /// What recovery found on open
    recovery: RecoveryReport,
}

impl Store {
    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Open the WAL
    /// 3. Recover: load the snapshot, replay the WAL
    /// 4. Ready to serve requests
    ///
    /// If recovery fails the WAL is closed before the error is returned.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let wal = Wal::open(&config.wal_path(), config.wal_sync_strategy)?;

        let recovered =
            recovery::recover(&wal, &config.snapshot_path(), &config.snapshot_tmp_path());
        let (table, report) = match recovered {
            Ok(recovered) => recovered,
            Err(e) => {
                if let Err(close_err) = wal.close() {
                    error!(error = %close_err, "failed to close WAL after aborted recovery");
                }
                return Err(e);
            }
        };

        Ok(Self {
            config,
            wal,
            table: RwLock::new(table),
            recovery: report,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Get a value by key
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.table.read().get(key).map(<[u8]>::to_vec)
    }

    /// Set a key-value pair
    ///
    /// The table is only updated once the WAL append succeeded; a failed
    /// append leaves it unchanged. `Ok` means the write is applied. A failing
    /// automatic checkpoint afterwards is logged and retried on the next
    /// write, and does not turn the write into an error.
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut table = self.table.write();

        let record = LogRecord::put(key, value);
        self.wal.append(&record)?;
        table.apply(record);

        self.maybe_checkpoint(&table);
        Ok(())
    }

    /// Delete a key
    ///
    /// Deleting a missing key is not an error and is still logged. The
    /// record carries the removed value, or an empty one.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let mut table = self.table.write();

        let previous = table.get(key).map(<[u8]>::to_vec).unwrap_or_default();
        let record = LogRecord::delete(key, previous);
        self.wal.append(&record)?;
        table.apply(record);

        self.maybe_checkpoint(&table);
        Ok(())
    }

    /// Number of live keys
    pub fn size(&self) -> usize {
        self.table.read().len()
    }

    /// Snapshot the table and truncate the WAL
    ///
    /// Blocks every other operation for its whole duration.
    pub fn checkpoint(&self) -> Result<CheckpointStats> {
        let table = self.table.write();
        checkpoint::run(&table, &self.wal, &self.config)
    }

    /// Close the store, syncing the WAL to disk
    pub fn close(self) -> Result<()> {
        self.wal.close()
    }

    /// Internal auto-checkpoint (called with the write lock held)
    ///
    /// The mutation that triggered it is already durable, so a failure here
    /// is only logged.
    fn maybe_checkpoint(&self, table: &MemTable) {
        let limit = match self.config.checkpoint_wal_bytes {
            Some(limit) => limit,
            None => return,
        };
        let wal_bytes = self.wal.len();
        if wal_bytes < limit {
            return;
        }
        if let Err(e) = checkpoint::run(table, &self.wal, &self.config) {
            error!(error = %e, wal_bytes, limit, "automatic checkpoint failed");
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Current WAL size in bytes
    pub fn wal_size(&self) -> u64 {
        self.wal.len()
    }

    /// Approximate bytes held by live keys and values
    pub fn table_bytes(&self) -> usize {
        self.table.read().approximate_size()
    }

    /// What recovery found when this store was opened
    pub fn recovery_report(&self) -> &RecoveryReport {
        &self.recovery
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
