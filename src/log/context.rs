//! Log context collection
//!
//! This module collects contextual information (CPU ID, task ID, timestamp)
//! for each log entry.

use core::sync::atomic::{AtomicUsize, Ordering};

/// Logical clock, advanced once per collected context.
static LOG_CLOCK: AtomicUsize = AtomicUsize::new(0);

/// Contextual information for a log entry
pub(super) struct LogContext {
    /// ID of the CPU that generated the log
    pub(super) cpu_id: usize,
    /// ID of the task/process that generated the log
    pub(super) task_id: u32,
    /// Monotonic stamp, strictly increasing across all loggers
    pub(super) timestamp: usize,
}

/// Collects context information for a new log entry
///
/// The subsystem runs on a single logical core and has no timer of its own,
/// so the timestamp is a logical clock rather than wall time. Task ids are
/// carried in the message text by callers that know them.
pub(super) fn collect_context() -> LogContext {
    LogContext {
        cpu_id: 0,
        task_id: 0,
        timestamp: LOG_CLOCK.fetch_add(1, Ordering::Relaxed),
    }
}
