//! 📏 Capacity Controller - asks the table to hit the gym before the load and
//! to calm down after it.
//!
//! Every change is read-then-write: fetch the current (read, write) pair, swap
//! in the new write value, and send the pair back, so the read side survives
//! untouched. After an accepted change we sleep `wait_to_scale` to give the
//! table a moment to actually become the table we asked for.
//!
//! Asking for the capacity the table already has is a no-op, not a failure.
//! It gets a debug line and no settle sleep.

use anyhow::{Context, Result};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::app_config::Tunables;
use crate::backends::Table;
use crate::common::Capacity;
use crate::error::CapacityUpdateError;

/// 📏 Scales one table's write capacity between "push" and "baseline".
#[derive(Debug)]
pub(crate) struct CapacityController<T: Table> {
    table: T,
    tunables: Tunables,
}

impl<T: Table> CapacityController<T> {
    pub(crate) fn new(table: T, tunables: &Tunables) -> Self {
        Self {
            table,
            tunables: tunables.clone(),
        }
    }

    /// 📏 What the table is provisioned for right now.
    pub(crate) async fn capacity(&self) -> Result<Capacity> {
        self.table.provisioned_capacity().await.context(format!(
            "💀 Could not describe table '{}'. It may not exist, or we may not be allowed to look.",
            self.table.name()
        ))
    }

    /// 🚀 Raise write capacity to `push_write_capacity` for the load.
    pub(crate) async fn scale_up(&self) -> Result<()> {
        self.set_write_capacity(self.tunables.push_write_capacity).await
    }

    /// 🛏️ Put write capacity back to `baseline_write_capacity`.
    pub(crate) async fn scale_down(&self) -> Result<()> {
        self.set_write_capacity(self.tunables.baseline_write_capacity).await
    }

    async fn set_write_capacity(&self, write: i64) -> Result<()> {
        let current = self.capacity().await?;
        let requested = current.with_write(write);
        let applied = tolerate_unchanged(self.table.update_capacity(requested).await).context(format!(
            "💀 Table '{}' refused to go from {current} to {requested}",
            self.table.name()
        ))?;

        if applied {
            info!(
                "📏 '{}' capacity {current} → {requested}; settling for {:.1}s",
                self.table.name(),
                self.tunables.wait_to_scale
            );
            sleep(self.tunables.settle_delay()).await;
        } else {
            debug!("😴 '{}' is already at {requested}, nothing to change", self.table.name());
        }
        Ok(())
    }
}

/// 🤷 Fold a no-op rejection into success. `Ok(true)` means the change was applied,
/// `Ok(false)` means there was nothing to change.
fn tolerate_unchanged(result: std::result::Result<(), CapacityUpdateError>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(CapacityUpdateError::Unchanged) => Ok(false),
        Err(err @ CapacityUpdateError::Rejected(_)) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::in_mem::InMemoryTable;
    use std::time::Duration;
    use tokio::time::Instant;

    fn tunables() -> Tunables {
        Tunables {
            push_write_capacity: 100,
            baseline_write_capacity: 5,
            wait_to_scale: 30.0,
            ..Tunables::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_scaling_up_keeps_the_reads_and_waits_to_settle() {
        let table = InMemoryTable::new("prices", Capacity { read: 7, write: 5 });
        let controller = CapacityController::new(table.clone(), &tunables());
        let before = Instant::now();

        controller.scale_up().await.expect("💀 scale_up");

        assert_eq!(
            controller.capacity().await.expect("💀 capacity"),
            Capacity { read: 7, write: 100 }
        );
        assert!(before.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_asking_for_what_you_have_is_fine_and_instant() {
        let table = InMemoryTable::new("prices", Capacity { read: 7, write: 100 });
        let controller = CapacityController::new(table.clone(), &tunables());
        let before = Instant::now();

        controller.scale_up().await.expect("💀 a no-op scale_up is not an error");

        assert_eq!(before.elapsed(), Duration::ZERO, "no settle sleep for a no-op");
        let state = table.state().await;
        assert!(state.capacity_updates.is_empty());
        assert_eq!(state.capacity, Capacity { read: 7, write: 100 });
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_scaling_down_returns_to_baseline() {
        let table = InMemoryTable::new("prices", Capacity { read: 3, write: 100 });
        let controller = CapacityController::new(table.clone(), &tunables());

        controller.scale_down().await.expect("💀 scale_down");

        assert_eq!(table.state().await.capacity_updates, vec![Capacity { read: 3, write: 5 }]);
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_a_real_rejection_propagates() {
        let table = InMemoryTable::new("prices", Capacity { read: 3, write: 5 });
        table.state().await.reject_capacity_updates = true;
        let controller = CapacityController::new(table.clone(), &tunables());

        let err = controller.scale_up().await.expect_err("rejections are real errors");

        assert!(matches!(
            err.downcast_ref::<CapacityUpdateError>(),
            Some(CapacityUpdateError::Rejected(_))
        ));
        assert!(format!("{err:#}").contains("refused"));
    }

    #[test]
    fn the_one_where_unchanged_is_not_applied_but_not_an_error() {
        assert!(tolerate_unchanged(Ok(())).expect("applied"));
        assert!(!tolerate_unchanged(Err(CapacityUpdateError::Unchanged)).expect("no-op"));
        assert!(tolerate_unchanged(Err(CapacityUpdateError::Rejected("nope".into()))).is_err());
    }
}
