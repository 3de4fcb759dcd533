// ai
//! 🚚 The Adaptive Batch Writer - part forklift, part diplomat.
//!
//! 🎬 *[a table with 5 write units. a stream with 2 million records.]*
//! *[somebody has to find the speed at which neither side cries.]*
//!
//! Records are buffered until the batch holds `batch_limit` of them (25, the
//! API's hard cap). Then the writer sleeps `wait` seconds, submits the whole
//! batch in one bulk call, and reads the room:
//!
//! 1. 🛑 malformed request → fatal, batch left exactly as it was
//! 2. 🐢 any other failure → `wait *= more`; fatal past `max_wait`, otherwise the
//!    identical batch is retried next time
//! 3. 🪫 some items unprocessed → `wait *= more`; the batch becomes exactly the
//!    unprocessed items (the rest landed); fatal past `max_wait`
//! 4. ✅ everything landed → `wait *= less`, batch emptied
//!
//! `flush()` keeps submitting until the batch is empty or something fatal happens.
//!
//! 🧠 Knowledge graph:
//! - `Batch` (batch.rs): bounded owned buffer - push / is_full / drain_into_submission / replace_with
//! - `Delay` (delay.rs): the multiplicative `wait` scalar
//! - `ThroughputCounters` (progress.rs): observational WPS logging, no steering
//! - A full batch left behind by a transient failure is retried *before* the
//!   next record is appended, so no record is ever dropped on the floor.
//!
//! 🦆 The duck once submitted 26 items. The API returned a ValidationException. The duck has learned.

mod batch;
mod delay;

use anyhow::Result;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use crate::app_config::Tunables;
use crate::backends::Table;
use crate::common::{Record, parse_record};
use crate::error::{SubmitError, WriteError};
use crate::progress::ThroughputCounters;
use batch::Batch;
use delay::Delay;

/// 📈 What the writer went through, for the post-load summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriterStats {
    /// 📡 Bulk-write calls made, successful or not.
    pub submissions: u64,
    /// ✅ Items confirmed written.
    pub accepted: u64,
    /// 🐢 Submissions that failed with a retryable error.
    pub throttled: u64,
    /// 🪫 Items handed back unprocessed (and queued for retry).
    pub unprocessed: u64,
}

/// 🚚 Buffers records into batches and pushes them at a rate the table can stomach.
///
/// Owns its batch and delay outright. One writer per table per load; share
/// nothing, lock nothing.
#[derive(Debug)]
pub(crate) struct BatchWriter<T: Table> {
    table: T,
    batch: Batch,
    delay: Delay,
    progress: ThroughputCounters,
    stats: WriterStats,
}

impl<T: Table> BatchWriter<T> {
    pub(crate) fn new(table: T, tunables: &Tunables) -> Self {
        Self {
            table,
            batch: Batch::new(tunables.batch_limit),
            delay: Delay::from_tunables(tunables),
            progress: ThroughputCounters::new(tunables.report_every),
            stats: WriterStats::default(),
        }
    }

    pub(crate) fn stats(&self) -> WriterStats {
        WriterStats {
            accepted: self.progress.total(),
            ..self.stats
        }
    }

    /// 📥 Parse one raw line and write it. A line that isn't a JSON object is fatal.
    pub(crate) async fn write_item(&mut self, line: &str) -> Result<()> {
        let record = parse_record(line).map_err(|err| WriteError::InvalidRecord(err.into()))?;
        self.write_record(record).await
    }

    /// 📥 Buffer one record; submit the moment the batch is full.
    ///
    /// Pure buffering below the limit. No network, no sleep, O(1).
    pub(crate) async fn write_record(&mut self, record: Record) -> Result<()> {
        self.progress.start();
        // -- 🔄 a transient failure left the batch full; it goes out before anything else comes in
        while self.batch.is_full() {
            self.submit().await?;
        }
        self.batch.push(record);
        if self.batch.is_full() {
            self.submit().await?;
        }
        Ok(())
    }

    /// 🚿 Drain the partial batch left at end-of-stream. Empty batch on `Ok`.
    pub(crate) async fn flush(&mut self) -> Result<()> {
        debug!(
            "🚿 flushing {} pending items into '{}'",
            self.batch.len(),
            self.table.name()
        );
        while !self.batch.is_empty() {
            self.submit().await?;
        }
        Ok(())
    }

    /// 📡 One attempt: sleep `wait`, submit the whole batch, interpret the outcome.
    async fn submit(&mut self) -> std::result::Result<(), WriteError> {
        sleep(self.delay.as_duration()).await;

        let submission = self.batch.drain_into_submission();
        let submitted = submission.len();
        self.stats.submissions += 1;
        trace!(
            "📡 submitting {submitted} items to '{}' after waiting {:.3}s",
            self.table.name(),
            self.delay.secs()
        );

        match self.table.batch_write(&submission).await {
            Err(SubmitError::Malformed(source)) => {
                self.batch.replace_with(submission);
                Err(WriteError::MalformedRequest {
                    table: self.table.name().to_string(),
                    source,
                })
            }
            Err(SubmitError::Transient(source)) => {
                self.batch.replace_with(submission);
                self.stats.throttled += 1;
                if self.delay.back_off() {
                    warn!(
                        "🐢 bulk write to '{}' failed ({source}); retrying the same {submitted} items, wait is now {:.3}s",
                        self.table.name(),
                        self.delay.secs()
                    );
                    Ok(())
                } else {
                    Err(WriteError::Throttled {
                        table: self.table.name().to_string(),
                        wait_secs: self.delay.secs(),
                        source,
                    })
                }
            }
            Ok(unprocessed) if unprocessed.is_empty() => {
                self.delay.ease_off();
                self.accept(submitted);
                Ok(())
            }
            Ok(unprocessed) => {
                let returned = unprocessed.len();
                self.accept(submitted.saturating_sub(returned));
                self.stats.unprocessed += returned as u64;
                self.batch.replace_with(unprocessed);
                if self.delay.back_off() {
                    warn!(
                        "🪫 '{}' handed back {returned} of {submitted} items; wait is now {:.3}s",
                        self.table.name(),
                        self.delay.secs()
                    );
                    Ok(())
                } else {
                    Err(WriteError::CapacityExhausted {
                        table: self.table.name().to_string(),
                        unprocessed: returned,
                        wait_secs: self.delay.secs(),
                    })
                }
            }
        }
    }

    fn accept(&mut self, accepted: usize) {
        if let Some(report) = self.progress.record(accepted as u64) {
            info!("{:<8} ... {} WPS", report.total, report.writes_per_sec);
        }
    }
}
