//! Snapshot Writer
//!
//! Writes a table to a temporary file, forces it to disk, then renames it
//! over the published snapshot. An interrupted write never replaces the
//! previous snapshot.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{KvError, Result};
use crate::memtable::MemTable;
use crate::wal::LogRecord;

use super::{SnapshotHeader, SnapshotInfo, HEADER_SIZE};

/// Durably replace the snapshot at `path` with the contents of `table`
///
/// `tmp_path` must live in the same directory as `path` so the final rename
/// is atomic. On failure the temp file is removed and `path` is untouched.
pub fn write_atomic(path: &Path, tmp_path: &Path, table: &MemTable) -> Result<SnapshotInfo> {
    let info = match write_file(tmp_path, table) {
        Ok(info) => info,
        Err(e) => {
            let _ = fs::remove_file(tmp_path);
            return Err(e);
        }
    };

    if let Err(e) = fs::rename(tmp_path, path) {
        let _ = fs::remove_file(tmp_path);
        return Err(e.into());
    }
    sync_parent_dir(path)?;

    Ok(info)
}

fn write_file(path: &Path, table: &MemTable) -> Result<SnapshotInfo> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    let mut writer = BufWriter::new(file);

    let entries = table.len() as u64;
    bincode::serialize_into(&mut writer, &SnapshotHeader::new(entries))
        .map_err(|e| KvError::Snapshot(format!("failed to encode header: {}", e)))?;

    let mut bytes = HEADER_SIZE as u64;
    for (key, value) in table.iter() {
        let frame = LogRecord::put(key, value).encode_frame();
        writer.write_all(&frame)?;
        bytes += frame.len() as u64;
    }

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    Ok(SnapshotInfo { entries, bytes })
}

/// Persist the rename itself
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        let dir = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        fs::File::open(dir)?.sync_all()?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}
