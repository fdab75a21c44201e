//! MemTable Module
//!
//! The in-memory key → value table rebuilt on every startup.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Apply replayed log records deterministically
//! - Track an approximate byte size
//!
//! ## Data Structure Choice
//! A plain `HashMap`: no ordering is needed because there are no range
//! scans. The table carries no lock of its own; `Store` owns it behind a
//! single `RwLock` so a WAL append and the matching mutation share one
//! critical section.

mod table;

pub use table::{Iter, MemTable};
