//! Metrics instrumentation for zone-edit.
//!
//! All metrics are prefixed with `zone_edit.`

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

use crate::gateway::GatewayOp;

/// Record a finished engine transaction.
pub fn record_transaction(operation: Operation, result: TransactionResult, duration: Duration) {
    counter!(
        "zone_edit.transaction.count",
        "operation" => operation.as_str(),
        "result" => result.as_str()
    )
    .increment(1);
    histogram!("zone_edit.transaction.duration.seconds", "operation" => operation.as_str())
        .record(duration.as_secs_f64());
}

/// Engine operations, for metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Reload without content change.
    Resync,
    /// Read the zone.
    Show,
    /// Add one record.
    Add,
    /// Delete one record.
    Delete,
    /// Apply a batch.
    ApplySet,
}

impl Operation {
    /// Label value.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Resync => "resync",
            Operation::Show => "show",
            Operation::Add => "add",
            Operation::Delete => "delete",
            Operation::ApplySet => "apply_set",
        }
    }
}

/// Transaction result type for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionResult {
    /// Completed without anything to commit (show, resync).
    Ok,
    /// A change was stored.
    Updated,
    /// Nothing changed; store skipped.
    Unchanged,
    /// Batch rejected before applying.
    InvalidConfig,
    /// Transaction failed.
    Error,
}

impl TransactionResult {
    fn as_str(self) -> &'static str {
        match self {
            TransactionResult::Ok => "ok",
            TransactionResult::Updated => "updated",
            TransactionResult::Unchanged => "unchanged",
            TransactionResult::InvalidConfig => "invalid_config",
            TransactionResult::Error => "error",
        }
    }
}

/// Record a privileged helper invocation.
pub fn record_gateway_op(op: GatewayOp, success: bool, duration: Duration) {
    let result = if success { "success" } else { "error" };
    counter!("zone_edit.gateway.op.count", "op" => op.as_str(), "result" => result).increment(1);
    histogram!("zone_edit.gateway.op.duration.seconds", "op" => op.as_str())
        .record(duration.as_secs_f64());
}

/// Record how long a caller waited for the zone lock.
pub fn record_lock_wait(duration: Duration) {
    histogram!("zone_edit.lock.wait.seconds").record(duration.as_secs_f64());
}

/// Record the serial committed for a zone.
pub fn record_serial(zone: &str, serial: u32) {
    gauge!("zone_edit.zone.serial", "zone" => zone.to_string()).set(serial as f64);
}

/// Record the number of records changed by a committed transaction.
pub fn record_records_changed(count: usize) {
    histogram!("zone_edit.transaction.records_changed").record(count as f64);
}

/// Helper for timing operations.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
