//! 📦 Batch - a bounded, owned buffer of pending puts.
//!
//! The writer fills it, drains it into a submission, and then refills it with
//! whatever the store handed back. Plain owned value. Not shared. Not locked.
//! Not interesting, which is exactly what you want from a buffer.

use crate::common::Record;

#[derive(Debug)]
pub(crate) struct Batch {
    entries: Vec<Record>,
    limit: usize,
}

impl Batch {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            entries: Vec::with_capacity(limit),
            limit,
        }
    }

    /// ➕ Append one record. Callers check `is_full` first; overfilling is a bug upstream.
    pub(crate) fn push(&mut self, record: Record) {
        debug_assert!(!self.is_full(), "batch pushed past its limit of {}", self.limit);
        self.entries.push(record);
    }

    pub(crate) fn is_full(&self) -> bool {
        self.entries.len() >= self.limit
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// 🚚 Take every pending record out for a submission, leaving the batch empty.
    pub(crate) fn drain_into_submission(&mut self) -> Vec<Record> {
        std::mem::replace(&mut self.entries, Vec::with_capacity(self.limit))
    }

    /// 🔄 Make `subset` the batch's entire contents (the retry set, or the
    /// untouched submission after a failed call).
    pub(crate) fn replace_with(&mut self, subset: Vec<Record>) {
        debug_assert!(subset.len() <= self.limit, "retry set larger than the batch limit");
        self.entries = subset;
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[Record] {
        &self.entries
    }
}
