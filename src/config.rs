//! Configuration for walkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{KvError, Result};

/// Main configuration for a walkv store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log)
    ///     └── snapshot.db      (last checkpoint)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Checkpoint Configuration
    // -------------------------------------------------------------------------
    /// Run a checkpoint automatically once the WAL reaches this many bytes.
    /// `None` leaves checkpointing entirely to the caller.
    pub checkpoint_wal_bytes: Option<u64>,
}

/// WAL sync strategy
///
/// Every append is flushed to the OS before it is acknowledged. The strategy
/// only decides how often the OS is additionally forced to push those bytes
/// to stable storage, which is what bounds crash loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N entries; up to N-1 acknowledged entries can be lost on a crash
    EveryNEntries { count: usize },
}

impl Default for WalSyncStrategy {
    fn default() -> Self {
        WalSyncStrategy::EveryNEntries { count: 10 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./walkv_data"),
            wal_sync_strategy: WalSyncStrategy::default(),
            checkpoint_wal_bytes: None,
        }
    }
}

impl Config {
    /// File name of the write-ahead log inside `data_dir`
    pub const WAL_FILENAME: &'static str = "wal.log";

    /// File name of the published snapshot inside `data_dir`
    pub const SNAPSHOT_FILENAME: &'static str = "snapshot.db";

    /// File name a checkpoint writes to before renaming it into place
    pub const SNAPSHOT_TMP_FILENAME: &'static str = "snapshot.db.tmp";

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join(Self::WAL_FILENAME)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(Self::SNAPSHOT_FILENAME)
    }

    pub fn snapshot_tmp_path(&self) -> PathBuf {
        self.data_dir.join(Self::SNAPSHOT_TMP_FILENAME)
    }

    /// Reject settings the store cannot honor
    pub fn validate(&self) -> Result<()> {
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(KvError::Config(
                "wal sync interval must be at least 1 entry".to_string(),
            ));
        }

        if self.checkpoint_wal_bytes == Some(0) {
            return Err(KvError::Config(
                "checkpoint threshold must be at least 1 byte".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Checkpoint automatically once the WAL grows past `bytes`
    pub fn checkpoint_wal_bytes(mut self, bytes: u64) -> Self {
        self.config.checkpoint_wal_bytes = Some(bytes);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
