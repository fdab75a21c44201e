//! Error types for walkv
//!
//! Provides a unified error type for all store operations, plus the
//! payload-level [`DecodeError`] produced by the log codec.

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for walkv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption at offset {offset}: checksum mismatch (stored {stored:#010x}, computed {computed:#010x})")]
    Corruption {
        offset: u64,
        stored: u32,
        computed: u32,
    },

    #[error("WAL corruption at offset {offset}: frame length {len} exceeds maximum")]
    FrameTooLarge { offset: u64, len: u64 },

    #[error("WAL corruption at offset {offset}: declared frame length {declared} does not match its contents")]
    LengthMismatch { offset: u64, declared: u64 },

    #[error("data integrity error in frame at offset {offset}: {source}")]
    DataIntegrity {
        offset: u64,
        #[source]
        source: DecodeError,
    },

    #[error("record too large: {size} bytes (max {max})")]
    RecordTooLarge { size: usize, max: usize },

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse error category, for callers that decide between retrying,
/// logging or aborting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The underlying file system call failed
    Io,
    /// Stored bytes do not match their checksum, or a file is structurally broken
    Corruption,
    /// A checksummed frame holds a payload that cannot be interpreted
    DataIntegrity,
    /// The caller supplied something the store refuses to write or use
    InvalidInput,
}

impl KvError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            KvError::Io(_) => ErrorKind::Io,
            KvError::Corruption { .. }
            | KvError::FrameTooLarge { .. }
            | KvError::LengthMismatch { .. }
            | KvError::Snapshot(_) => ErrorKind::Corruption,
            KvError::DataIntegrity { .. } => ErrorKind::DataIntegrity,
            KvError::RecordTooLarge { .. } | KvError::Config(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Failure to decode a record payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("truncated {field}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("declared {field} length {len} overflows the address space")]
    Overflow { field: &'static str, len: u64 },

    #[error("{0} unexpected trailing bytes after value")]
    TrailingBytes(usize),

    #[error("unknown operation tag {0:?}")]
    UnknownOperation(String),
}
