// ai
//! 📦 Common data structures - the building blocks of dynaload
//!
//! ---
//!
//! 🎬 COLD OPEN - INT. DATA CENTER - 3:47 AM
//!
//! A gzip file sits in a bucket. Inside it, a few million lines of JSON, each one
//! dreaming of becoming a row in a table that has exactly 5 write capacity units.
//! Somebody is going to have to negotiate. That somebody is built out of the
//! structs in this file.
//!
//! 🦆
//!
//! This module defines the humble, load-bearing types that every other module
//! passes around: a [`Record`], a [`Capacity`] pair, and an [`ObjectLocation`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 🎯 One logical entity on its way into the table. A JSON object, nothing more.
///
/// No identity beyond its own primary key attribute(s) - and the table is the
/// one who enforces those, not us. We just carry the thing.
pub type Record = Map<String, Value>;

/// 🔬 Parse one raw line from the source into a [`Record`].
///
/// The line must be a JSON *object*. Arrays, strings, a lonely `42`: all rejected,
/// because the key-value store only stores things that have keys.
pub(crate) fn parse_record(line: &str) -> Result<Record> {
    let value: Value = serde_json::from_str(line).context(format!(
        "💀 This line walked in claiming to be JSON. It was not. First 80 chars: '{}'",
        line.chars().take(80).collect::<String>()
    ))?;
    match value {
        Value::Object(record) => Ok(record),
        // -- 🦆 valid JSON, wrong shape. like a cat in a dog costume.
        honestly_who_knows => anyhow::bail!(
            "💀 Expected a JSON object per line, got a {} instead. Tables want keys.",
            json_kind(&honestly_who_knows)
        ),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 📏 The provisioned throughput of a table: how many reads and writes per second
/// it has agreed to tolerate before it starts handing items back to us.
///
/// Always read before mutating, so that whichever dimension we are *not* changing
/// survives the update untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub read: i64,
    pub write: i64,
}

impl Capacity {
    /// 🔧 Same read capacity, different write capacity. The read side never asked for this drama.
    pub fn with_write(self, write: i64) -> Self {
        Self { write, ..self }
    }
}

impl std::fmt::Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "read={} write={}", self.read, self.write)
    }
}

/// 🪣 A bucket/key pair in the object store. The home address of a blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🧙 "One does not simply walk into S3 without a key." - Boromir, cloud architect
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}
