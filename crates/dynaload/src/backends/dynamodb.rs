// ai
//! 🗄️📡 DynamoDB Table - the throttled destination with opinions about capacity.
//!
//! COLD OPEN - INT. WAR ROOM - 2:13 AM
//!
//! "We sent 25 items," the engineer said. "It took 21." The room went quiet.
//! "What about the other four?" Someone pointed at the response body.
//! `UnprocessedItems`. The table had simply... handed them back. Politely.
//! Like a waiter returning a dish you didn't order.
//!
//! This module implements [`Table`] over `aws-sdk-dynamodb`:
//! - `BatchWriteItem` for bulk puts, with unprocessed items mapped back to the
//!   exact records we sent (original order preserved, no lossy round-trip)
//! - `DescribeTable` / `UpdateTable` for provisioned throughput
//! - an error taxonomy that separates "your request is wrong" from "slow down"
//!
//! 🧠 Knowledge graph:
//! - JSON → `AttributeValue`: null→NULL, bool→BOOL, number→N, string→S, array→L, object→M
//! - Non-retryable: construction failures, builder failures, `ValidationException`,
//!   `ResourceNotFoundException`. Everything else is treated as throttling.
//! - No-op capacity update: `ValidationException` whose message says the
//!   throughput "will not change". Code first, message second, because the code
//!   alone is too broad.
//!
//! 🦆 The duck has provisioned exactly 1 WCU. The duck is always throttled.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::update_table::UpdateTableError;
use aws_sdk_dynamodb::types::{AttributeValue, ProvisionedThroughput, PutRequest, WriteRequest};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::backends::Table;
use crate::common::{Capacity, Record};
use crate::error::{CapacityUpdateError, SubmitError};

/// 📋 An item as DynamoDB sees it: attribute name → typed attribute value.
type Item = HashMap<String, AttributeValue>;

const VALIDATION_EXCEPTION: &str = "ValidationException";
const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";
// 📜 From "The provisioned throughput for the table will not change. The requested value equals the current value."
const THROUGHPUT_UNCHANGED: &str = "will not change";

/// 🗄️ A DynamoDB table, addressed by name, with a client that knows the way.
#[derive(Clone)]
pub(crate) struct DynamoDbTable {
    client: aws_sdk_dynamodb::Client,
    name: String,
}

impl std::fmt::Debug for DynamoDbTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoDbTable")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl DynamoDbTable {
    /// 🚀 Point a fresh client at `name`. No network call yet; the table gets to
    /// keep its secrets until we ask for its capacity.
    pub(crate) fn new(sdk_config: &aws_config::SdkConfig, name: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_dynamodb::Client::new(sdk_config),
            name: name.into(),
        }
    }
}

#[async_trait]
impl Table for DynamoDbTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn batch_write(&self, records: &[Record]) -> std::result::Result<Vec<Record>, SubmitError> {
        let items: Vec<Item> = records.iter().map(to_item).collect();

        // 🔧 PutRequest::build fails only if the item is missing. It never is. But if the
        // builder ever disagrees, that's a malformed request, not a throttle.
        let requests = items
            .iter()
            .cloned()
            .map(|item| {
                PutRequest::builder()
                    .set_item(Some(item))
                    .build()
                    .map(|put| WriteRequest::builder().put_request(put).build())
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| SubmitError::Malformed(Box::new(err)))?;

        let output = self
            .client
            .batch_write_item()
            .request_items(self.name.clone(), requests)
            .send()
            .await
            .map_err(classify_batch_write_error)?;

        let unprocessed: Vec<Item> = output
            .unprocessed_items
            .unwrap_or_default()
            .remove(&self.name)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|request| request.put_request)
            .map(|put| put.item)
            .collect();

        trace!(
            "📡 BatchWriteItem on '{}': {} sent, {} handed back",
            self.name,
            records.len(),
            unprocessed.len()
        );
        Ok(restore_original_order(records, &items, unprocessed))
    }

    async fn provisioned_capacity(&self) -> Result<Capacity> {
        let output = self
            .client
            .describe_table()
            .table_name(&self.name)
            .send()
            .await
            .context(format!(
                "💀 DescribeTable failed for '{}'. Either the table does not exist, \
                 or it exists and does not want to talk to us. Check name, region, and IAM.",
                self.name
            ))?;

        let throughput = output
            .table()
            .and_then(|table| table.provisioned_throughput())
            .context(format!(
                "💀 Table '{}' came back without provisioned throughput. \
                 On-demand tables have no capacity to scale. Nothing to negotiate.",
                self.name
            ))?;

        Ok(Capacity {
            read: throughput.read_capacity_units().unwrap_or_default(),
            write: throughput.write_capacity_units().unwrap_or_default(),
        })
    }

    async fn update_capacity(&self, capacity: Capacity) -> std::result::Result<(), CapacityUpdateError> {
        let throughput = ProvisionedThroughput::builder()
            .read_capacity_units(capacity.read)
            .write_capacity_units(capacity.write)
            .build()
            .map_err(|err| CapacityUpdateError::Rejected(Box::new(err)))?;

        debug!("🔧 UpdateTable '{}' → {capacity}", self.name);
        self.client
            .update_table()
            .table_name(&self.name)
            .provisioned_throughput(throughput)
            .send()
            .await
            .map_err(classify_update_table_error)?;
        Ok(())
    }
}

/// 🔄 JSON value → DynamoDB attribute value. Numbers keep their textual form,
/// which is exactly what the `N` type wants anyway.
fn to_attribute_value(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(values) => AttributeValue::L(values.iter().map(to_attribute_value).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), to_attribute_value(v)))
                .collect(),
        ),
    }
}

fn to_item(record: &Record) -> Item {
    record
        .iter()
        .map(|(k, v)| (k.clone(), to_attribute_value(v)))
        .collect()
}

/// 🔙 DynamoDB attribute value → JSON. Only used when the store hands back an
/// item we can't line up with anything we sent, so it still gets retried.
fn from_attribute_value(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::N(n) => number_or_string(n),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::L(values) => Value::Array(values.iter().map(from_attribute_value).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_attribute_value(v)))
                .collect(),
        ),
        AttributeValue::Ss(strings) => Value::Array(strings.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(numbers) => Value::Array(numbers.iter().map(|n| number_or_string(n)).collect()),
        AttributeValue::B(blob) => Value::from(blob.as_ref().to_vec()),
        AttributeValue::Bs(blobs) => Value::Array(
            blobs.iter().map(|blob| Value::from(blob.as_ref().to_vec())).collect(),
        ),
        // -- 🤷 a type newer than this SDK. we never send those, so we never get them back
        _ => Value::Null,
    }
}

fn number_or_string(n: &str) -> Value {
    n.parse::<serde_json::Number>()
        .map(Value::Number)
        .unwrap_or_else(|_| Value::String(n.to_string()))
}

fn from_item(item: &Item) -> Record {
    item.iter()
        .map(|(k, v)| (k.clone(), from_attribute_value(v)))
        .collect()
}

/// 🧩 Map unprocessed items back to the records we sent, in the order we sent them.
///
/// Each unprocessed item claims the first not-yet-claimed identical submitted
/// item, so duplicate records in one batch are counted correctly. An item that
/// matches nothing we sent (the store normalized a number, say) is converted
/// back into a record and appended, so it is retried rather than lost.
fn restore_original_order(records: &[Record], submitted: &[Item], unprocessed: Vec<Item>) -> Vec<Record> {
    let mut claimed = vec![false; submitted.len()];
    let mut strays = Vec::new();
    for item in &unprocessed {
        let slot = submitted
            .iter()
            .enumerate()
            .position(|(index, candidate)| !claimed[index] && candidate == item);
        match slot {
            Some(index) => claimed[index] = true,
            None => {
                warn!("👻 unprocessed item does not match any submitted item; retrying it as returned");
                strays.push(from_item(item));
            }
        }
    }
    records
        .iter()
        .zip(claimed)
        .filter_map(|(record, was_claimed)| was_claimed.then(|| record.clone()))
        .chain(strays)
        .collect()
}

fn is_non_retryable_code(code: Option<&str>) -> bool {
    matches!(code, Some(VALIDATION_EXCEPTION) | Some(RESOURCE_NOT_FOUND))
}

fn is_unchanged_rejection(code: Option<&str>, message: Option<&str>) -> bool {
    code == Some(VALIDATION_EXCEPTION) && message.is_some_and(|m| m.contains(THROUGHPUT_UNCHANGED))
}

/// 🚦 Malformed vs. transient. The request either can't work, or can't work *yet*.
fn classify_batch_write_error(err: SdkError<BatchWriteItemError>) -> SubmitError {
    let non_retryable = match &err {
        SdkError::ConstructionFailure(_) => true,
        SdkError::ServiceError(context) => {
            matches!(context.err(), BatchWriteItemError::ResourceNotFoundException(_))
                || is_non_retryable_code(context.err().code())
        }
        _ => false,
    };
    if non_retryable {
        SubmitError::Malformed(Box::new(err))
    } else {
        SubmitError::Transient(Box::new(err))
    }
}

fn classify_update_table_error(err: SdkError<UpdateTableError>) -> CapacityUpdateError {
    let unchanged = err
        .as_service_error()
        .is_some_and(|service| is_unchanged_rejection(service.code(), service.message()));
    if unchanged {
        CapacityUpdateError::Unchanged
    } else {
        CapacityUpdateError::Rejected(Box::new(err))
    }
}
