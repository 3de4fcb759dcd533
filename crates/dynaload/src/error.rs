// ai
//! 💀 Errors - the ones callers actually need to tell apart.
//!
//! Most of dynaload is happy with `anyhow` and a well-written `.context(...)`.
//! But a few failures change what the caller should do next, and those get a
//! real type. They still travel inside `anyhow::Error`; grab them back out with
//! `err.downcast_ref::<WriteError>()`.
//!
//! 🦆 The duck reviewed this taxonomy. The duck has no notes. The duck is a duck.

use thiserror::Error;

/// 📦 The boxed cause we carry around when the concrete error type belongs to
/// some SDK we would rather not leak through our own signatures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 🚨 Why a single bulk-write submission failed, as reported by a [`Table`](crate::backends::Table).
#[derive(Debug, Error)]
pub enum SubmitError {
    /// 🛑 The request itself is wrong. Retrying would just be wrong again, but slower.
    #[error("bulk write request is malformed")]
    Malformed(#[source] BoxError),
    /// 🐢 Anything else: throttling, a sleepy endpoint, a dropped connection.
    /// Treated as a hint to slow down, not as a reason to give up.
    #[error("bulk write failed with a retryable error")]
    Transient(#[source] BoxError),
}

/// 📏 Why a capacity update did not happen.
#[derive(Debug, Error)]
pub enum CapacityUpdateError {
    /// 😴 We asked for the capacity the table already has. Nothing to do. Not an error, really.
    #[error("requested capacity equals the current capacity")]
    Unchanged,
    /// 💀 A real rejection.
    #[error("capacity update was rejected")]
    Rejected(#[source] BoxError),
}

/// 💀 Fatal outcomes of the adaptive batch writer. Each one ends the load.
#[derive(Debug, Error)]
pub enum WriteError {
    /// 🛑 The store said the request was malformed. Non-retryable; the batch is left as-is.
    #[error("bulk write to table '{table}' was rejected as malformed")]
    MalformedRequest {
        table: String,
        #[source]
        source: BoxError,
    },
    /// 🐢 The store kept failing and the delay grew past `max_wait`.
    #[error("bulk write to table '{table}' kept failing; backoff reached {wait_secs:.2}s")]
    Throttled {
        table: String,
        wait_secs: f64,
        #[source]
        source: BoxError,
    },
    /// 🪫 Unprocessed items kept coming back even after the delay grew past `max_wait`.
    #[error(
        "unable to push items to table '{table}': {unprocessed} items still unprocessed after backoff reached {wait_secs:.2}s"
    )]
    CapacityExhausted {
        table: String,
        unprocessed: usize,
        wait_secs: f64,
    },
    /// 🔬 A source line was not a JSON object.
    #[error("record is not a JSON object")]
    InvalidRecord(#[source] BoxError),
}
