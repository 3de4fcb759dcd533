//! 🔧 App Configuration - the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." - every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! The knobs that govern backoff and capacity live in [`Tunables`] and are handed
//! explicitly to the writer and the capacity controller. Nobody reaches for a
//! global. There is no global. We checked.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::records::ExportFormat;

/// 📏 The bulk-write API takes at most 25 put requests per call. Not 26. We asked.
pub const BATCH_LIMIT: usize = 25;

/// 📦 The AppConfig: one struct to rule them all.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 🎛️ Backoff, capacity, and reporting knobs.
    #[serde(default)]
    pub tunables: Tunables,
    /// ☁️ Where the cloud is, if not where the SDK would guess.
    #[serde(default)]
    pub aws: AwsConfig,
    /// 🎯 What we're actually here to do.
    pub job: JobConfig,
}

/// 🎛️ Every number that shapes how hard we push and how politely we back off.
///
/// Durations are plain seconds as `f64`, because the delay is multiplied by
/// fractional factors all day long and `Duration` does not enjoy that.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Tunables {
    /// ⏱️ Sleep before the first submission.
    #[serde(default = "default_initial_wait")]
    pub initial_wait: f64,
    /// 🐢 Multiplier applied to the wait after any throttling signal. Must be > 1.
    #[serde(default = "default_wait_more_factor")]
    pub wait_more_factor: f64,
    /// 🐇 Multiplier applied after a clean submission. Must be in (0, 1).
    #[serde(default = "default_wait_less_factor")]
    pub wait_less_factor: f64,
    /// 💀 Once the wait grows past this, we stop pretending things will improve.
    #[serde(default = "default_max_wait")]
    pub max_wait: f64,
    /// 🪶 Floor for the wait. Clean submissions shrink it down to here and no further.
    #[serde(default = "default_min_wait")]
    pub min_wait: f64,
    /// ⏳ How long to let the table settle after a capacity change.
    #[serde(default = "default_wait_to_scale")]
    pub wait_to_scale: f64,
    /// 🚀 Write capacity requested for the duration of the load.
    #[serde(default = "default_push_write_capacity")]
    pub push_write_capacity: i64,
    /// 🛏️ Write capacity restored once the load is done.
    #[serde(default = "default_baseline_write_capacity")]
    pub baseline_write_capacity: i64,
    /// 📊 Emit a progress line every this many accepted items.
    #[serde(default = "default_report_every")]
    pub report_every: u64,
    /// 📦 Records per bulk write. Capped by [`BATCH_LIMIT`].
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
}

fn default_initial_wait() -> f64 {
    1.0
}

fn default_wait_more_factor() -> f64 {
    1.5
}

fn default_wait_less_factor() -> f64 {
    0.9
}

fn default_max_wait() -> f64 {
    60.0
}

// -- 🪶 10ms: well under any real round trip, still a sleep tokio can actually perform
fn default_min_wait() -> f64 {
    0.01
}

// -- ⏳ 30s: long enough for the table to finish updating, short enough to keep your coffee warm
fn default_wait_to_scale() -> f64 {
    30.0
}

fn default_push_write_capacity() -> i64 {
    100
}

fn default_baseline_write_capacity() -> i64 {
    5
}

fn default_report_every() -> u64 {
    1000
}

fn default_batch_limit() -> usize {
    BATCH_LIMIT
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            initial_wait: default_initial_wait(),
            wait_more_factor: default_wait_more_factor(),
            wait_less_factor: default_wait_less_factor(),
            max_wait: default_max_wait(),
            min_wait: default_min_wait(),
            wait_to_scale: default_wait_to_scale(),
            push_write_capacity: default_push_write_capacity(),
            baseline_write_capacity: default_baseline_write_capacity(),
            report_every: default_report_every(),
            batch_limit: default_batch_limit(),
        }
    }
}

impl Tunables {
    /// 🔒 Reject knob combinations that would make the backoff meaningless or endless.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.initial_wait > 0.0,
            "💀 initial_wait must be > 0 (got {}). Zero times anything is still zero; the backoff would never back off.",
            self.initial_wait
        );
        anyhow::ensure!(
            self.wait_more_factor > 1.0,
            "💀 wait_more_factor must be > 1 (got {}). Otherwise throttling makes us go faster. Bold, but no.",
            self.wait_more_factor
        );
        anyhow::ensure!(
            self.wait_less_factor > 0.0 && self.wait_less_factor < 1.0,
            "💀 wait_less_factor must be in (0, 1) (got {}).",
            self.wait_less_factor
        );
        anyhow::ensure!(
            self.max_wait.is_finite(),
            "💀 max_wait must be a finite number of seconds (got {}). Waiting forever is not a backoff strategy.",
            self.max_wait
        );
        anyhow::ensure!(
            self.min_wait > 0.0 && self.min_wait <= self.initial_wait,
            "💀 min_wait must be in (0, initial_wait] (got {}, initial_wait {}).",
            self.min_wait,
            self.initial_wait
        );
        anyhow::ensure!(
            self.max_wait >= self.initial_wait,
            "💀 max_wait ({}) must be at least initial_wait ({}). We'd be fatal before we started.",
            self.max_wait,
            self.initial_wait
        );
        anyhow::ensure!(
            self.wait_to_scale >= 0.0,
            "💀 wait_to_scale must not be negative (got {}). Time only goes one way here.",
            self.wait_to_scale
        );
        anyhow::ensure!(
            self.push_write_capacity > 0 && self.baseline_write_capacity > 0,
            "💀 write capacities must be positive (push={}, baseline={}).",
            self.push_write_capacity,
            self.baseline_write_capacity
        );
        anyhow::ensure!(self.report_every > 0, "💀 report_every must be > 0.");
        anyhow::ensure!(
            (1..=BATCH_LIMIT).contains(&self.batch_limit),
            "💀 batch_limit must be between 1 and {BATCH_LIMIT} (got {}). The API has a hard cap and no sense of humor.",
            self.batch_limit
        );
        Ok(())
    }

    /// ⏳ The settle delay as a `Duration`, for `tokio::time::sleep`.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs_f64(self.wait_to_scale)
    }
}

/// ☁️ Optional overrides for the AWS SDK's own region/endpoint discovery.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AwsConfig {
    /// 🌎 Region override. None = let the SDK find one (env, profile, IMDS, vibes).
    #[serde(default)]
    pub region: Option<String>,
    /// 🏠 Endpoint override, e.g. LocalStack at `http://localhost:4566`.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

/// 🎯 The job to run. Externally tagged, so TOML reads `[job.Load]`, `[job.Export]`, `[job.Capacity]`.
#[derive(Debug, Deserialize, Clone)]
pub enum JobConfig {
    /// 🚚 Stream an object's records into a table.
    Load(LoadJobConfig),
    /// 📤 Write a local JSON object out as a gzipped line-delimited export.
    Export(ExportJobConfig),
    /// 📏 Just tell me the table's capacity.
    Capacity(CapacityJobConfig),
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoadJobConfig {
    pub bucket: String,
    pub key: String,
    pub table: String,
    /// 🫁 Set to false when the object is plain text instead of gzip.
    #[serde(default = "default_decompress")]
    pub decompress: bool,
}

fn default_decompress() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportJobConfig {
    /// 📄 Local JSON file holding one top-level object: key → value.
    pub input_file: PathBuf,
    pub bucket: String,
    /// 🗝️ Destination key; `{format}` is replaced with the format name.
    pub key_template: String,
    #[serde(default)]
    pub format: ExportFormat,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CapacityJobConfig {
    pub table: String,
}

/// 🚀 Load the config - from a file, from env vars, or from the sheer power of hoping.
///
/// 🔧 Merges environment variables (`DYNALOAD_*`, nested with `__`) with an
/// optional TOML file. TOML wins on conflicts. The tunables are validated before
/// anyone gets a chance to run with a factor of 0.5 for "more".
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("DYNALOAD_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (DYNALOAD_*). \
             The file exists in our hearts, but apparently not in a shape serde recognizes.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (DYNALOAD_*). \
                 No file was provided - this one's all on the environment. Classic."
            .to_string(),
    };

    let app_config: AppConfig = config.extract().context(context_msg)?;
    app_config
        .tunables
        .validate()
        .context("💀 The tunables parsed, but they don't add up to a sane backoff.")?;
    Ok(app_config)
}
