// AI
//! 📊 progress.rs - "Are we there yet?" - every bulk load, every time, forever.
//!
//! 🚀 Counts accepted items and, every `report_every` of them, hands back how many
//! have landed so far and how fast, for the writer to log as `12000    ... 97 WPS`.
//! Writes per second. The number you stare at while the table decides how it
//! feels about you.
//!
//! ⚠️ Purely observational. Nothing in here gets to steer the writer.
//! Watching this number will not make it go faster. We've tried. Science says no.

use tokio::time::Instant;

/// 📸 One progress observation, as emitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ProgressReport {
    /// 📦 Items accepted since the first write.
    pub(crate) total: u64,
    /// 🚀 Accepted items per second since the first write, rounded.
    pub(crate) writes_per_sec: u64,
}

/// 📊 Running throughput counters for one writer.
#[derive(Debug)]
pub(crate) struct ThroughputCounters {
    report_every: u64,
    /// 🔄 accepted since the last report; reset every `report_every`
    interval: u64,
    total: u64,
    started: Option<Instant>,
}

impl ThroughputCounters {
    pub(crate) fn new(report_every: u64) -> Self {
        Self {
            report_every,
            interval: 0,
            total: 0,
            started: None,
        }
    }

    /// ⏱️ Start the clock on the first write. Later calls are no-ops.
    pub(crate) fn start(&mut self) {
        self.started.get_or_insert_with(Instant::now);
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }

    /// ➕ Count `accepted` more items; return a report when an interval completes.
    pub(crate) fn record(&mut self, accepted: u64) -> Option<ProgressReport> {
        self.start();
        self.total += accepted;
        self.interval += accepted;
        if self.interval < self.report_every {
            return None;
        }
        self.interval = 0;

        let elapsed = self
            .started
            .map(|started| started.elapsed().as_secs_f64())
            .unwrap_or_default();
        // -- 🐛 zero elapsed means "instantly", which is not a rate, it's a brag
        let writes_per_sec = if elapsed > 0.0 {
            (self.total as f64 / elapsed).round() as u64
        } else {
            0
        };
        Some(ProgressReport {
            total: self.total,
            writes_per_sec,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn the_one_where_a_report_fires_every_interval_and_the_counter_resets() {
        let mut counters = ThroughputCounters::new(50);
        counters.start();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(counters.record(25), None);
        let report = counters.record(25).expect("💀 50 accepted should trigger a report");
        assert_eq!(report, ProgressReport { total: 50, writes_per_sec: 25 });

        // -- interval restarted: the next 25 stay quiet
        assert_eq!(counters.record(25), None);
        assert_eq!(counters.total(), 75);
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_partial_acceptance_still_adds_up() {
        let mut counters = ThroughputCounters::new(40);
        assert_eq!(counters.record(21), None);
        tokio::time::advance(Duration::from_secs(1)).await;
        let report = counters.record(25).expect("💀 46 >= 40 should report");
        assert_eq!(report.total, 46);
        assert_eq!(report.writes_per_sec, 46);
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_no_time_passed_means_no_rate() {
        let mut counters = ThroughputCounters::new(1);
        let report = counters.record(1).expect("💀 one should report at interval 1");
        assert_eq!(report.writes_per_sec, 0);
    }
}
