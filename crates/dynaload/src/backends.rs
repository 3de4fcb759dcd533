//! 🔌 Backends - where the real I/O happens.
//!
//! 🪣 The object store holds the records before the load and receives the
//! exports after. 🗄️ The table is the throttled, capacity-provisioned destination
//! that accepts items in bulk and occasionally hands some of them back.
//!
//! Everything above this module talks to the two traits below and never learns
//! which cloud is on the other end. The in-memory doubles (test builds only)
//! script the table's moods so the writer's backoff can be exercised without
//! paying for it.
//!
//! 🦆 The duck is here because every file must have one. This is law. Do not question the duck.

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::AsyncBufRead;

use crate::common::{Capacity, ObjectLocation, Record};
use crate::error::{CapacityUpdateError, SubmitError};

mod dynamodb;
mod s3;
#[cfg(test)]
pub(crate) mod in_mem;

pub(crate) use dynamodb::DynamoDbTable;
pub(crate) use s3::S3ObjectStore;

/// 📖 An object body being streamed in. Boxed so stores can hand back whatever
/// reader their SDK gives them.
pub(crate) type ObjectReader = Box<dyn AsyncBufRead + Send + Unpin>;

/// 🪣 A blob store addressed by bucket and key.
///
/// # Contract
/// - `get_object` opens the object body as a stream; bytes arrive as they are
///   read, never all at once. Missing objects are errors at open time.
/// - `put_object` overwrites whatever was there. No questions, no versioning drama.
#[async_trait]
pub(crate) trait ObjectStore: std::fmt::Debug + Send + Sync {
    /// 📥 Open the bytes living at `location` for reading.
    async fn get_object(&self, location: &ObjectLocation) -> Result<ObjectReader>;
    /// 📤 Write `body` to `location`, replacing any existing object.
    async fn put_object(&self, location: &ObjectLocation, body: Vec<u8>) -> Result<()>;
}

/// 🗄️ A named table in a throughput-limited key-value store.
///
/// # Contract
/// - `batch_write` makes exactly one bulk-write call with every record given.
///   `Ok(unprocessed)` carries the records the store declined for lack of
///   capacity, in their original relative order. An empty vec means all landed.
/// - `update_capacity` reports a request for the current capacity as
///   [`CapacityUpdateError::Unchanged`] so callers can shrug it off.
#[async_trait]
pub(crate) trait Table: std::fmt::Debug + Send + Sync {
    /// 🏷️ The table's name, as the store knows it.
    fn name(&self) -> &str;
    /// 📡 Submit one bulk write. See the trait docs for what comes back.
    async fn batch_write(&self, records: &[Record]) -> std::result::Result<Vec<Record>, SubmitError>;
    /// 📏 Point-in-time read of the provisioned capacity.
    async fn provisioned_capacity(&self) -> Result<Capacity>;
    /// 🔧 Apply a new (read, write) capacity pair.
    async fn update_capacity(&self, capacity: Capacity) -> std::result::Result<(), CapacityUpdateError>;
}
