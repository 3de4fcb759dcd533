//! ⏱️ Delay - the writer's self-imposed speed limit.
//!
//! One scalar, `wait`, in seconds. Trouble multiplies it by `more`; a clean
//! submission multiplies it by `less`, but never below the configured `min`
//! floor. It is never reset and never added to. Past `max`, the writer gives up.

use std::time::Duration;

use crate::app_config::Tunables;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Delay {
    wait: f64,
    more: f64,
    less: f64,
    min: f64,
    max: f64,
}

impl Delay {
    pub(crate) fn from_tunables(tunables: &Tunables) -> Self {
        Self {
            wait: tunables.initial_wait,
            more: tunables.wait_more_factor,
            less: tunables.wait_less_factor,
            min: tunables.min_wait,
            max: tunables.max_wait,
        }
    }

    /// ⏱️ Current wait in seconds.
    pub(crate) fn secs(&self) -> f64 {
        self.wait
    }

    pub(crate) fn as_duration(&self) -> Duration {
        Duration::from_secs_f64(self.wait)
    }

    /// 🐢 Slow down. Returns `false` once the wait has grown past the maximum.
    pub(crate) fn back_off(&mut self) -> bool {
        self.wait *= self.more;
        self.wait <= self.max
    }

    /// 🐇 Ease off the brake after a clean submission, down to the `min_wait` floor.
    pub(crate) fn ease_off(&mut self) {
        self.wait = (self.wait * self.less).max(self.min);
    }
}
