//! # Previously, on dynaload...
//!
//! 🎬 The table was throttled. The bucket was far away. The CI runner had no
//! AWS credentials and no intention of getting any. Someone had to fake it.
//!
//! `in_mem` provides an in-memory [`ObjectStore`] and [`Table`] for tests.
//! The table follows a script: each `batch_write` pops the next [`Outcome`]
//! (accept everything, hand back some items, throw a tantrum). When the script
//! runs out, it accepts everything, like a tired parent.
//!
//! Both doubles keep their state behind an `Arc<Mutex<...>>` so tests can
//! peek inside after handing a clone to the code under test.
//!
//! ⚠️ This is NOT for production. This is for tests. It is `#[cfg(test)]` for a reason.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::backends::{ObjectReader, ObjectStore, Table};
use crate::common::{Capacity, ObjectLocation, Record};
use crate::error::{CapacityUpdateError, SubmitError};

/// 🪣 A bucket made of RAM. Keys never expire, because tests never live that long.
#[derive(Debug, Default, Clone)]
pub(crate) struct InMemoryObjectStore {
    objects: Arc<Mutex<HashMap<ObjectLocationKey, Vec<u8>>>>,
}

type ObjectLocationKey = (String, String);

fn key_of(location: &ObjectLocation) -> ObjectLocationKey {
    (location.bucket.clone(), location.key.clone())
}

impl InMemoryObjectStore {
    pub(crate) async fn insert(&self, location: &ObjectLocation, body: Vec<u8>) {
        self.objects.lock().await.insert(key_of(location), body);
    }

    pub(crate) async fn object(&self, location: &ObjectLocation) -> Option<Vec<u8>> {
        self.objects.lock().await.get(&key_of(location)).cloned()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get_object(&self, location: &ObjectLocation) -> Result<ObjectReader> {
        let bytes = self
            .object(location)
            .await
            .context(format!("💀 NoSuchKey: {location} is not in the RAM bucket"))?;
        Ok(Box::new(std::io::Cursor::new(bytes)))
    }

    async fn put_object(&self, location: &ObjectLocation, body: Vec<u8>) -> Result<()> {
        self.insert(location, body).await;
        Ok(())
    }
}

/// 🎭 What the scripted table does with the next bulk write.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    /// ✅ Everything lands.
    Accept,
    /// 🪫 The records at these positions come back unprocessed; the rest land.
    Unprocessed(Vec<usize>),
    /// 🐢 A retryable failure. Nothing lands.
    Transient,
    /// 🛑 A malformed-request failure. Nothing lands.
    Malformed,
}

/// 🗒️ Everything the scripted table remembers.
#[derive(Debug)]
pub(crate) struct TableState {
    pub(crate) stored: Vec<Record>,
    pub(crate) submissions: Vec<Vec<Record>>,
    pub(crate) script: VecDeque<Outcome>,
    pub(crate) capacity: Capacity,
    pub(crate) capacity_updates: Vec<Capacity>,
    pub(crate) reject_capacity_updates: bool,
}

/// 🗄️ A table that does what the test tells it to. Refreshing, honestly.
#[derive(Debug, Clone)]
pub(crate) struct InMemoryTable {
    name: String,
    state: Arc<Mutex<TableState>>,
}

impl InMemoryTable {
    pub(crate) fn new(name: &str, capacity: Capacity) -> Self {
        Self {
            name: name.to_string(),
            state: Arc::new(Mutex::new(TableState {
                stored: Vec::new(),
                submissions: Vec::new(),
                script: VecDeque::new(),
                capacity,
                capacity_updates: Vec::new(),
                reject_capacity_updates: false,
            })),
        }
    }

    /// 🎬 Queue up the next outcomes, in order.
    pub(crate) async fn script(&self, outcomes: impl IntoIterator<Item = Outcome>) {
        self.state.lock().await.script.extend(outcomes);
    }

    pub(crate) async fn state(&self) -> tokio::sync::MutexGuard<'_, TableState> {
        self.state.lock().await
    }
}

#[async_trait]
impl Table for InMemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn batch_write(&self, records: &[Record]) -> std::result::Result<Vec<Record>, SubmitError> {
        let mut state = self.state.lock().await;
        state.submissions.push(records.to_vec());
        match state.script.pop_front().unwrap_or(Outcome::Accept) {
            Outcome::Accept => {
                state.stored.extend_from_slice(records);
                Ok(Vec::new())
            }
            Outcome::Unprocessed(positions) => {
                let (returned, landed): (Vec<_>, Vec<_>) = records
                    .iter()
                    .enumerate()
                    .partition(|(index, _)| positions.contains(index));
                state.stored.extend(landed.into_iter().map(|(_, r)| r.clone()));
                Ok(returned.into_iter().map(|(_, r)| r.clone()).collect())
            }
            Outcome::Transient => Err(SubmitError::Transient(
                "ProvisionedThroughputExceededException: slow down".into(),
            )),
            Outcome::Malformed => Err(SubmitError::Malformed(
                "ValidationException: one or more parameter values were invalid".into(),
            )),
        }
    }

    async fn provisioned_capacity(&self) -> Result<Capacity> {
        Ok(self.state.lock().await.capacity)
    }

    async fn update_capacity(&self, capacity: Capacity) -> std::result::Result<(), CapacityUpdateError> {
        let mut state = self.state.lock().await;
        if state.capacity == capacity {
            return Err(CapacityUpdateError::Unchanged);
        }
        if state.reject_capacity_updates {
            return Err(CapacityUpdateError::Rejected(
                "LimitExceededException: too many capacity changes today".into(),
            ));
        }
        state.capacity = capacity;
        state.capacity_updates.push(capacity);
        Ok(())
    }
}
