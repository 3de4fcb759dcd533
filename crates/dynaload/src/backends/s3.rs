// ai
//! 🪣📡 S3 Object Store - the cloud-to-ground data paratrooper.
//!
//! INT. AWS CONSOLE - NIGHT. A lone bucket sits in us-east-1, bloated with
//! gzipped JSON lines. Someone typed `PUT` once and walked away. The data has
//! been waiting. Patient. Ready to be hauled down and pushed into a table.
//!
//! This module wraps the AWS S3 SDK behind the [`ObjectStore`] trait:
//! `GetObject` → `ByteStream::into_async_read()` → `BufReader`, and `PutObject`
//! for exports. The object is never held in memory whole.
//! Decompression and line splitting live upstream in `records::source`; this
//! file only moves bytes.
//!
//! 🦆 The duck has no clearance for AWS. It watches from the edge of the VPC.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tokio::io::BufReader;
use tracing::{debug, trace};

use crate::app_config::AwsConfig;
use crate::backends::{ObjectReader, ObjectStore};
use crate::common::ObjectLocation;

/// 🪣 `ObjectStore` backed by a real S3 client.
///
/// The SDK client is cheap to clone (it's an `Arc` in a trench coat), so this
/// struct derives `Clone` without guilt.
#[derive(Clone)]
pub(crate) struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

// 🐛 The SDK client's Debug output is a novella. Nobody debugging a load wants to read it.
impl std::fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ObjectStore").finish_non_exhaustive()
    }
}

impl S3ObjectStore {
    /// 🚀 Build an S3 client from the shared SDK config.
    ///
    /// When an `endpoint_url` override is configured (LocalStack, MinIO, a
    /// suspiciously local "cloud"), path-style addressing is forced because
    /// virtual-host buckets on `localhost` are a lie we refuse to tell.
    pub(crate) fn new(sdk_config: &aws_config::SdkConfig, aws: &AwsConfig) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);
        if aws.endpoint_url.is_some() {
            builder = builder.force_path_style(true);
        }
        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, location: &ObjectLocation) -> Result<ObjectReader> {
        debug!("🪣 opening {location}");
        let response = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .context(format!(
                "💀 GetObject failed for {location}. The bucket ghosted us. \
                 Check: bucket name, key path, region, and credentials."
            ))?;

        // 🔗 ByteStream → AsyncRead → BufReader. Bytes come down as the reader pulls them.
        trace!(
            "🪣 streaming {location} ({} bytes advertised)",
            response.content_length().unwrap_or_default()
        );
        let reader: ObjectReader = Box::new(BufReader::new(response.body.into_async_read()));
        Ok(reader)
    }

    async fn put_object(&self, location: &ObjectLocation, body: Vec<u8>) -> Result<()> {
        debug!("📤 writing {} bytes to {location}", body.len());
        self.client
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .body(ByteStream::from(body))
            .send()
            .await
            .context(format!(
                "💀 PutObject failed for {location}. The bytes were ready. S3 was not. \
                 Check: IAM permissions, bucket policy, KMS key access."
            ))?;
        Ok(())
    }
}
