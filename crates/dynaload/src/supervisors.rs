// ai
//! 🎬 *[camera pans across a dimly lit server room]*
//! 🎬 "In a world where tables have 5 write units..."
//! 🎬 "One supervisor dared to ask for 100."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Bulk Load Supervisor - part middle manager, part landlord.
//!
//! One load, start to finish:
//!
//! ```text
//! scale_up ─▶ open source ─▶ write_item × N ─▶ flush ─▶ scale_down
//!                  └────────── any failure ──────────────────┘
//! ```
//!
//! `scale_down` always runs once `scale_up` has, whatever happened in between.
//! If the load failed AND the restore failed, the load's error is the one you
//! get back; the restore failure is logged at `warn!`. If the load went fine
//! but the restore did not, the restore's error is returned. A table left at
//! 100 write units costs real money, so nobody gets to pretend that's a success.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::app_config::Tunables;
use crate::backends::{ObjectStore, Table};
use crate::capacity::CapacityController;
use crate::common::ObjectLocation;
use crate::records::{RecordSource, SourceObject};
use crate::writer::{BatchWriter, WriterStats};

/// 🧾 What a finished load has to say for itself.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub table: String,
    pub source: ObjectLocation,
    pub stats: WriterStats,
    pub elapsed: Duration,
}

/// 📦 Owns one load: the store to read from, the table to write to, and the knobs.
#[derive(Debug)]
pub(crate) struct Supervisor<'a, S: ObjectStore, T: Table + Clone> {
    store: &'a S,
    table: T,
    tunables: &'a Tunables,
}

impl<'a, S: ObjectStore, T: Table + Clone> Supervisor<'a, S, T> {
    pub(crate) fn new(store: &'a S, table: T, tunables: &'a Tunables) -> Self {
        Self { store, table, tunables }
    }

    /// 🚀 Scale up, stream every record into the table, flush, scale back down.
    pub(crate) async fn load(&self, source: SourceObject) -> Result<LoadSummary> {
        let started = Instant::now();
        let table_name = self.table.name().to_string();
        let location = source.location.clone();
        info!("🚀 loading {location} into '{table_name}'");

        let controller = CapacityController::new(self.table.clone(), self.tunables);
        controller
            .scale_up()
            .await
            .context(format!("💀 Could not scale up '{table_name}' before the load"))?;

        let mut writer = BatchWriter::new(self.table.clone(), self.tunables);
        let loaded = self
            .stream(source, &mut writer)
            .await
            .context(format!("💀 Loading {location} into '{table_name}' failed"));
        let restored = controller
            .scale_down()
            .await
            .context(format!("💀 Could not restore '{table_name}' to its baseline capacity"));

        match (loaded, restored) {
            (Ok(()), Ok(())) => {
                let summary = LoadSummary {
                    table: table_name,
                    source: location,
                    stats: writer.stats(),
                    elapsed: started.elapsed(),
                };
                info!(
                    "🏁 loaded {} items into '{}' in {:.1}s ({} submissions)",
                    summary.stats.accepted,
                    summary.table,
                    summary.elapsed.as_secs_f64(),
                    summary.stats.submissions
                );
                Ok(summary)
            }
            (Ok(()), Err(restore_err)) => Err(restore_err),
            (Err(load_err), Ok(())) => Err(load_err),
            (Err(load_err), Err(restore_err)) => {
                warn!("⚠️ the load failed and so did the cleanup: {restore_err:#}");
                Err(load_err)
            }
        }
    }

    async fn stream(&self, source: SourceObject, writer: &mut BatchWriter<T>) -> Result<()> {
        let mut lines = RecordSource::new(self.store, source).open().await?;
        while let Some(line) = lines.next_line().await? {
            writer.write_item(&line).await?;
        }
        writer.flush().await
    }
}
