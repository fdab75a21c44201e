//! MemTable implementation

use std::collections::hash_map::{self, HashMap};

use crate::wal::{LogRecord, OpKind};

/// In-memory table of live keys
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemTable {
    data: HashMap<Vec<u8>, Vec<u8>>,
    /// Sum of key and value lengths
    size: usize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.data.get(key).map(Vec::as_slice)
    }

    /// Insert or overwrite a key, returning the previous value
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Option<Vec<u8>> {
        let added = key.len() + value.len();
        let key_len = key.len();

        let previous = self.data.insert(key, value);
        match &previous {
            Some(old) => self.size = self.size + added - key_len - old.len(),
            None => self.size += added,
        }
        previous
    }

    /// Remove a key, returning its value if it was present
    pub fn remove(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        let removed = self.data.remove(key);
        if let Some(value) = &removed {
            self.size -= key.len() + value.len();
        }
        removed
    }

    /// Apply a replayed record: put upserts, delete removes
    pub fn apply(&mut self, record: LogRecord) {
        match record.op {
            OpKind::Put => {
                self.put(record.key, record.value);
            }
            OpKind::Delete => {
                self.remove(&record.key);
            }
        }
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Approximate size in bytes (keys + values)
    pub fn approximate_size(&self) -> usize {
        self.size
    }

    /// Iterate over all live pairs in no particular order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.data.iter(),
        }
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.size = 0;
    }
}

/// Iterator over MemTable entries
pub struct Iter<'a> {
    inner: hash_map::Iter<'a, Vec<u8>, Vec<u8>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}
