// ai
//! 📤🫁 Record Export - a mapping goes in, a gzipped line-delimited object comes out.
//!
//! 🎬 *[a BTreeMap walks into a GzEncoder. the bartender asks "the usual?"]*
//! *["sorted, one per line, hold the whitespace," says the BTreeMap.]*
//!
//! Two shapes are on the menu:
//! - `json`: each line is `{key: value}`
//! - `dynamodb`: each line is `{"key": {"S": key}, "value": {"S": "<value as JSON text>"}}`,
//!   which is what the table's import feature wants to eat
//!
//! Keys are emitted in ascending order so the same mapping always produces the
//! same bytes. Deterministic output: the closest thing this industry has to peace.

use std::collections::BTreeMap;
use std::io::Write;
use std::str::FromStr;

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::backends::ObjectStore;
use crate::common::ObjectLocation;

/// 🏷️ The two line shapes an export can take. Parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum ExportFormat {
    #[default]
    Json,
    Dynamodb,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Dynamodb => "dynamodb",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "dynamodb" => Ok(Self::Dynamodb),
            other => anyhow::bail!("💀 Unknown export format '{other}'. We speak 'json' and 'dynamodb'. That's it."),
        }
    }
}

impl TryFrom<String> for ExportFormat {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// 🎯 Where an export lands: a bucket, a key template with a `{format}` slot, and the format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub bucket: String,
    pub key_template: String,
    pub format: ExportFormat,
}

impl ExportTarget {
    /// 🗝️ Resolve the template into a concrete location.
    pub fn location(&self) -> ObjectLocation {
        ObjectLocation::new(
            self.bucket.clone(),
            self.key_template.replace("{format}", self.format.as_str()),
        )
    }
}

fn export_line(key: &str, value: &Value, format: ExportFormat) -> Result<Value> {
    Ok(match format {
        ExportFormat::Json => {
            let mut line = Map::new();
            line.insert(key.to_string(), value.clone());
            Value::Object(line)
        }
        ExportFormat::Dynamodb => {
            let encoded = serde_json::to_string(value)
                .context(format!("💀 Could not JSON-encode the value under '{key}'"))?;
            json!({ "key": { "S": key }, "value": { "S": encoded } })
        }
    })
}

/// 🫁 Serialize `data` into gzipped newline-delimited JSON, ascending key order.
pub(crate) fn encode_export(data: &BTreeMap<String, Value>, format: ExportFormat) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for (key, value) in data {
        let line = export_line(key, value, format)?;
        serde_json::to_writer(&mut encoder, &line)
            .context(format!("💀 Could not write the export line for '{key}'"))?;
        encoder.write_all(b"\n")?;
    }
    encoder
        .finish()
        .context("💀 The gzip encoder refused to finish. The bytes are stuck in limbo.")
}

/// 📤 Encode `data` and write it to the resolved target, overwriting what's there.
///
/// Returns the fully-qualified `s3://bucket/key` of the written object.
pub(crate) async fn export_records<S: ObjectStore>(
    store: &S,
    data: &BTreeMap<String, Value>,
    target: &ExportTarget,
) -> Result<ObjectLocation> {
    let location = target.location();
    let body = encode_export(data, target.format)?;
    store
        .put_object(&location, body)
        .await
        .context(format!("💀 Export to {location} failed"))?;
    info!("📤 exported {} entries as {} to {location}", data.len(), target.format);
    Ok(location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::in_mem::InMemoryObjectStore;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn sample() -> BTreeMap<String, Value> {
        // -- inserted backwards on purpose; the output must not care
        let mut data = BTreeMap::new();
        data.insert("b".to_string(), json!(2));
        data.insert("a".to_string(), json!(1));
        data
    }

    fn gunzip_lines(bytes: &[u8]) -> Vec<Value> {
        let mut text = String::new();
        GzDecoder::new(bytes)
            .read_to_string(&mut text)
            .expect("💀 export should be valid gzip");
        assert!(text.ends_with('\n'), "every line is newline-terminated");
        text.lines()
            .map(|line| serde_json::from_str(line).expect("💀 every export line is JSON"))
            .collect()
    }

    #[test]
    fn the_one_where_json_export_is_sorted_single_key_objects() {
        let lines = gunzip_lines(&encode_export(&sample(), ExportFormat::Json).expect("💀 encode"));
        assert_eq!(lines, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[test]
    fn the_one_where_dynamodb_export_wraps_everything_in_strings() {
        let mut data = sample();
        data.insert("c".to_string(), json!({"nested": [true]}));

        let lines = gunzip_lines(&encode_export(&data, ExportFormat::Dynamodb).expect("💀 encode"));

        assert_eq!(
            lines,
            vec![
                json!({"key": {"S": "a"}, "value": {"S": "1"}}),
                json!({"key": {"S": "b"}, "value": {"S": "2"}}),
                json!({"key": {"S": "c"}, "value": {"S": "{\"nested\":[true]}"}}),
            ]
        );
    }

    #[test]
    fn the_one_where_format_names_ignore_their_caps_lock() {
        assert_eq!("JSON".parse::<ExportFormat>().expect("json"), ExportFormat::Json);
        assert_eq!("DynamoDB".parse::<ExportFormat>().expect("dynamodb"), ExportFormat::Dynamodb);
        assert!("csv".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn the_one_where_the_template_learns_its_format() {
        let target = ExportTarget {
            bucket: "exports".into(),
            key_template: "snapshots/{format}/latest.gz".into(),
            format: ExportFormat::Dynamodb,
        };
        assert_eq!(target.location().to_string(), "s3://exports/snapshots/dynamodb/latest.gz");
    }

    #[tokio::test]
    async fn the_one_where_export_overwrites_and_reports_its_location() {
        let store = InMemoryObjectStore::default();
        let target = ExportTarget {
            bucket: "exports".into(),
            key_template: "data.{format}.gz".into(),
            format: ExportFormat::Json,
        };
        store.insert(&target.location(), b"stale".to_vec()).await;

        let location = export_records(&store, &sample(), &target).await.expect("💀 export");

        assert_eq!(location.to_string(), "s3://exports/data.json.gz");
        let written = store.object(&location).await.expect("💀 object should exist");
        assert_eq!(gunzip_lines(&written).len(), 2);
    }
}
