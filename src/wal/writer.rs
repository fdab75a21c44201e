//! WAL Writer
//!
//! Owns the log file: appends frames, replays them, and truncates the log
//! after a checkpoint.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::WalSyncStrategy;
use crate::error::{KvError, Result};

use super::entry::{LogRecord, MAX_FRAME_SIZE};
use super::reader::{scan_records, WalScan};

/// Append-only write-ahead log
///
/// All file access goes through one internal mutex, so a `Wal` can be shared
/// by concurrent callers. Appends are totally ordered by that mutex.
pub struct Wal {
    path: PathBuf,
    sync_strategy: WalSyncStrategy,
    inner: Mutex<WalInner>,
}

struct WalInner {
    writer: BufWriter<File>,
    /// Bytes of complete frames in the file
    len: u64,
    /// Appends flushed to the OS but not yet forced to disk
    uncommitted: usize,
}

impl Wal {
    /// Open or create a WAL file
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            sync_strategy,
            inner: Mutex::new(WalInner {
                writer: BufWriter::new(file),
                len,
                uncommitted: 0,
            }),
        })
    }

    /// Append a record to the WAL
    ///
    /// Returns once the frame has been handed to the OS. Whether it has also
    /// reached stable storage depends on the sync strategy. A failed write or
    /// sync is rolled back: the file is cut to the last acknowledged frame, so
    /// a record reported as failed is never replayed.
    pub fn append(&self, record: &LogRecord) -> Result<()> {
        let frame_len = record.frame_len();
        if frame_len > MAX_FRAME_SIZE {
            return Err(KvError::RecordTooLarge {
                size: frame_len,
                max: MAX_FRAME_SIZE,
            });
        }
        let frame = record.encode_frame();

        let mut inner = self.inner.lock();

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => inner.uncommitted + 1 >= count,
        };

        let written = inner
            .writer
            .write_all(&frame)
            .and_then(|()| inner.writer.flush())
            .and_then(|()| {
                if due {
                    inner.writer.get_ref().sync_data()
                } else {
                    Ok(())
                }
            });
        if let Err(e) = written {
            if let Err(rollback) = inner.discard_unflushed() {
                warn!(path = %self.path.display(), error = %rollback, "failed to roll back partial WAL frame");
            }
            return Err(e.into());
        }

        inner.len += frame.len() as u64;
        if due {
            debug!(entries = inner.uncommitted + 1, wal_bytes = inner.len, "WAL synced");
            inner.uncommitted = 0;
        } else {
            inner.uncommitted += 1;
        }

        Ok(())
    }

    /// Read every record from the start of the log
    ///
    /// Fails closed: a checksum mismatch returns an error and no records.
    /// A torn final frame is cut off the file and replay stops before it.
    pub fn read_all(&self) -> Result<Vec<LogRecord>> {
        Ok(self.scan()?.records)
    }

    /// Like [`Wal::read_all`], also reporting the valid length and any torn tail
    pub fn scan(&self) -> Result<WalScan> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;

        let file = inner.writer.get_ref();
        let mut handle: &File = file;
        handle.seek(SeekFrom::Start(0))?;

        let scanned = scan_records(BufReader::new(handle));
        if let Ok(scan) = &scanned {
            if scan.torn_tail_bytes > 0 {
                let preserved = self.preserve_tail(file, scan.valid_len)?;
                warn!(
                    path = %self.path.display(),
                    valid_bytes = scan.valid_len,
                    discarded_bytes = scan.torn_tail_bytes,
                    preserved_at = %preserved.display(),
                    "discarding torn frame at end of WAL"
                );
                file.set_len(scan.valid_len)?;
                file.sync_all()?;
            }
        }
        handle.seek(SeekFrom::End(0))?;

        let mut scan = scanned?;
        if scan.torn_tail_bytes > 0 {
            scan.torn_tail_path = Some(self.torn_tail_path());
        }
        inner.len = scan.valid_len;
        Ok(scan)
    }

    /// Reset the log to zero length
    ///
    /// The caller must make sure no append runs concurrently; the store holds
    /// its exclusive lock for this.
    pub fn truncate(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;

        let reclaimed = inner.len;
        inner.writer.get_ref().set_len(0)?;
        inner.len = 0;
        inner.uncommitted = 0;

        let file = inner.writer.get_mut();
        file.seek(SeekFrom::Start(0))?;
        file.sync_all()?;
        debug!(path = %self.path.display(), reclaimed_bytes = reclaimed, "WAL truncated");

        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;
        inner.writer.get_ref().sync_all()?;
        inner.uncommitted = 0;
        Ok(())
    }

    /// Flush, sync and release the file handle
    pub fn close(self) -> Result<()> {
        let inner = self.inner.into_inner();
        let file = inner.writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Side file that keeps the bytes of a discarded torn tail
    pub fn torn_tail_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".torn");
        self.path.with_file_name(name)
    }

    /// Append everything from `from` to the end of `file` to the torn-tail
    /// side file and sync it
    fn preserve_tail(&self, file: &File, from: u64) -> Result<PathBuf> {
        let mut handle = file;
        handle.seek(SeekFrom::Start(from))?;
        let mut tail = Vec::new();
        handle.read_to_end(&mut tail)?;

        let path = self.torn_tail_path();
        let mut side = OpenOptions::new().create(true).append(true).open(&path)?;
        side.write_all(&tail)?;
        side.sync_all()?;
        Ok(path)
    }

    /// Current log size in bytes
    pub fn len(&self) -> u64 {
        self.inner.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends acknowledged since the last forced sync
    pub fn uncommitted_count(&self) -> usize {
        self.inner.lock().uncommitted
    }

    pub fn sync_strategy(&self) -> WalSyncStrategy {
        self.sync_strategy
    }
}

impl WalInner {
    /// Drop whatever a failed append left buffered and cut the file back to
    /// the last complete frame.
    fn discard_unflushed(&mut self) -> io::Result<()> {
        let file = self.writer.get_ref().try_clone()?;
        let failed = std::mem::replace(&mut self.writer, BufWriter::new(file));
        // into_parts hands back the buffer without flushing it
        let (old_file, _unflushed) = failed.into_parts();
        // never grow the file past what is actually there
        let current = old_file.metadata()?.len();
        old_file.set_len(self.len.min(current))?;
        Ok(())
    }
}
