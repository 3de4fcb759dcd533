// ai
//! 🚚 dynaload - pours line-delimited JSON out of a bucket and into a
//! throughput-limited table, without setting the table on fire.
//!
//! 🎬 *[narrator voice]* "The table had 5 write units. The file had 2 million lines.
//! Somebody had to negotiate."
//!
//! Three jobs, picked by the config's `[job.*]` section:
//! - 🚚 `Load`: raise the table's write capacity, stream every record in through
//!   the adaptive batch writer, put the capacity back
//! - 📤 `Export`: write a local JSON object to the bucket as gzipped NDJSON
//! - 📏 `Capacity`: report the table's provisioned capacity
//!
//! Everything returns `anyhow::Result`; the typed failures in [`error`] ride
//! along inside and can be pulled back out with `downcast_ref`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use serde_json::Value;
use tracing::info;

use crate::app_config::{
    AppConfig, AwsConfig, CapacityJobConfig, ExportJobConfig, JobConfig, LoadJobConfig,
};
use crate::backends::{DynamoDbTable, ObjectStore, S3ObjectStore, Table};
use crate::capacity::CapacityController;
use crate::common::{Capacity, ObjectLocation};
use crate::records::{ExportTarget, SourceObject, export_records};
use crate::supervisors::Supervisor;

pub mod app_config;
mod backends;
mod capacity;
pub mod common;
pub mod error;
mod progress;
pub mod records;
mod supervisors;
mod writer;

pub use supervisors::LoadSummary;
pub use writer::WriterStats;

/// 🧾 What a finished job reports back to whoever asked.
#[derive(Debug, Clone, PartialEq)]
pub enum JobReport {
    Loaded(LoadSummary),
    Exported(ObjectLocation),
    Capacity { table: String, capacity: Capacity },
}

/// 🚀 Build the AWS clients and run the configured job.
///
/// The tunables are validated here too, not just in `load_config`: an
/// `AppConfig` built by hand never went through the loader.
pub async fn run(app_config: AppConfig) -> Result<JobReport> {
    app_config
        .tunables
        .validate()
        .context("💀 Refusing to run with tunables that don't add up to a sane backoff.")?;
    let sdk_config = sdk_config(&app_config.aws).await;

    match &app_config.job {
        JobConfig::Load(job) => {
            let store = S3ObjectStore::new(&sdk_config, &app_config.aws);
            let table = DynamoDbTable::new(&sdk_config, job.table.clone());
            run_load(&store, table, job, &app_config).await
        }
        JobConfig::Export(job) => {
            let store = S3ObjectStore::new(&sdk_config, &app_config.aws);
            run_export(&store, job).await
        }
        JobConfig::Capacity(job) => {
            let table = DynamoDbTable::new(&sdk_config, job.table.clone());
            run_capacity(table, job, &app_config).await
        }
    }
}

/// ☁️ Let the SDK discover credentials and region, then apply our overrides on top.
async fn sdk_config(aws: &AwsConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &aws.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(endpoint_url) = &aws.endpoint_url {
        info!("🏠 using endpoint override {endpoint_url}");
        loader = loader.endpoint_url(endpoint_url);
    }
    loader.load().await
}

async fn run_load<S: ObjectStore, T: Table + Clone>(
    store: &S,
    table: T,
    job: &LoadJobConfig,
    app_config: &AppConfig,
) -> Result<JobReport> {
    let source = SourceObject {
        location: ObjectLocation::new(job.bucket.clone(), job.key.clone()),
        decompress: job.decompress,
    };
    let summary = Supervisor::new(store, table, &app_config.tunables)
        .load(source)
        .await?;
    Ok(JobReport::Loaded(summary))
}

async fn run_export<S: ObjectStore>(store: &S, job: &ExportJobConfig) -> Result<JobReport> {
    let data = read_export_input(&job.input_file).await?;
    let target = ExportTarget {
        bucket: job.bucket.clone(),
        key_template: job.key_template.clone(),
        format: job.format,
    };
    let location = export_records(store, &data, &target).await?;
    Ok(JobReport::Exported(location))
}

async fn run_capacity<T: Table>(
    table: T,
    job: &CapacityJobConfig,
    app_config: &AppConfig,
) -> Result<JobReport> {
    let capacity = CapacityController::new(table, &app_config.tunables)
        .capacity()
        .await?;
    Ok(JobReport::Capacity {
        table: job.table.clone(),
        capacity,
    })
}

/// 📄 The export input is one JSON object on disk: key → any JSON value.
async fn read_export_input(path: &Path) -> Result<BTreeMap<String, Value>> {
    let text = tokio::fs::read_to_string(path).await.context(format!(
        "💀 Could not read the export input '{}'. Check the path, then check it again.",
        path.display()
    ))?;
    serde_json::from_str(&text).context(format!(
        "💀 '{}' must hold a single JSON object (key → value). It holds something else.",
        path.display()
    ))
}
