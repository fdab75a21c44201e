//! Snapshot Reader

use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;

use crate::error::{KvError, Result};
use crate::memtable::MemTable;
use crate::wal::{decode_frame, FrameRead, FrameReader, OpKind};

use super::{SnapshotHeader, HEADER_SIZE};

/// Load a snapshot into a fresh table
///
/// Returns `Ok(None)` when no snapshot exists. Any structural problem
/// (bad header, checksum mismatch, torn or missing entries, trailing bytes,
/// duplicate keys) is a [`KvError::Snapshot`]; I/O failures stay `Io`.
pub fn load(path: &Path) -> Result<Option<MemTable>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut reader = BufReader::new(file);

    let header: SnapshotHeader = bincode::deserialize_from(&mut reader)
        .map_err(|e| KvError::Snapshot(format!("unreadable header: {}", e)))?;
    header.check()?;

    let mut frames = FrameReader::with_offset(reader, HEADER_SIZE as u64);
    let mut table = MemTable::new();

    for loaded in 0..header.entry_count {
        match frames.next_frame().map_err(into_snapshot_error)? {
            FrameRead::Frame { offset, payload } => {
                let record = decode_frame(offset, &payload).map_err(into_snapshot_error)?;
                if record.op != OpKind::Put {
                    return Err(KvError::Snapshot(format!(
                        "non-put record at offset {}",
                        offset
                    )));
                }
                if table.put(record.key, record.value).is_some() {
                    return Err(KvError::Snapshot(format!(
                        "duplicate key at offset {}",
                        offset
                    )));
                }
            }
            FrameRead::End => {
                return Err(KvError::Snapshot(format!(
                    "expected {} entries, found {}",
                    header.entry_count, loaded
                )));
            }
            FrameRead::TornTail { offset, .. } => {
                return Err(KvError::Snapshot(format!(
                    "truncated entry at offset {}",
                    offset
                )));
            }
        }
    }

    let end = frames.offset();
    match frames.next_frame().map_err(into_snapshot_error)? {
        FrameRead::End => Ok(Some(table)),
        _ => Err(KvError::Snapshot(format!(
            "trailing data after {} entries at offset {}",
            header.entry_count, end
        ))),
    }
}

fn into_snapshot_error(err: KvError) -> KvError {
    match err {
        KvError::Io(_) => err,
        other => KvError::Snapshot(other.to_string()),
    }
}
