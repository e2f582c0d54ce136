//! Log system core implementation
//!
//! This module encapsulates all logging state into a single `LogCore`
//! struct that can be instantiated independently for testing.

use super::buffer::LogBuffer;
use super::config::{DEFAULT_CONSOLE_LEVEL, DEFAULT_LOG_LEVEL};
use super::context;
use super::entry::LogEntry;
use super::level::LogLevel;
use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

/// Core logging system
///
/// Encapsulates the bounded buffer and filtering state. Can be instantiated
/// for testing or used as a global singleton in production.
pub struct LogCore {
    buffer: LogBuffer,

    /// Global log level threshold (controls buffering)
    global_level: AtomicU8,

    /// Console output level threshold (controls immediate printing)
    console_level: AtomicU8,
}

impl LogCore {
    /// Creates a new LogCore instance with default log levels
    ///
    /// - Global level: Info (Debug is filtered)
    /// - Console level: Warning (only warnings and worse are printed)
    pub const fn default() -> Self {
        Self {
            buffer: LogBuffer::new(),
            global_level: AtomicU8::new(DEFAULT_LOG_LEVEL as u8),
            console_level: AtomicU8::new(DEFAULT_CONSOLE_LEVEL as u8),
        }
    }

    /// Creates a new LogCore instance with custom log levels
    ///
    /// ```rust,ignore
    /// let test_log = LogCore::new(LogLevel::Debug, LogLevel::Warning);
    /// ```
    pub fn new(global_level: LogLevel, console_level: LogLevel) -> Self {
        Self {
            buffer: LogBuffer::new(),
            global_level: AtomicU8::new(global_level as u8),
            console_level: AtomicU8::new(console_level as u8),
        }
    }

    /// Core logging implementation
    ///
    /// 1. Early return if filtered by the global level
    /// 2. Collect context and build the entry on the stack
    /// 3. Store into the buffer
    /// 4. Hand to the console sink if it meets the console level
    pub fn _log(&self, level: LogLevel, args: fmt::Arguments) {
        if !self.is_level_enabled(level) {
            return;
        }

        let log_context = context::collect_context();
        let entry = LogEntry::from_args(
            level,
            log_context.cpu_id,
            log_context.task_id,
            log_context.timestamp,
            args,
        );

        self.buffer.write(&entry);

        if self.is_console_level(level) {
            super::emit_to_console(&entry);
        }
    }

    /// Reads the oldest log entry, `None` if the buffer is empty
    pub fn _read_log(&self) -> Option<LogEntry> {
        self.buffer.read()
    }

    /// Returns the number of unread log entries
    pub fn _log_len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the count of logs dropped due to buffer overflow
    pub fn _log_dropped_count(&self) -> usize {
        self.buffer.dropped_count()
    }

    /// Logs with level > threshold will be discarded.
    pub fn _set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Release);
    }

    pub fn _get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Acquire))
    }

    /// Only logs with level <= threshold will be immediately printed.
    pub fn _set_console_level(&self, level: LogLevel) {
        self.console_level.store(level as u8, Ordering::Release);
    }

    pub fn _get_console_level(&self) -> LogLevel {
        LogLevel::from_u8(self.console_level.load(Ordering::Acquire))
    }

    #[inline(always)]
    pub(super) fn is_level_enabled(&self, level: LogLevel) -> bool {
        level as u8 <= self.global_level.load(Ordering::Acquire)
    }

    #[inline(always)]
    fn is_console_level(&self, level: LogLevel) -> bool {
        level as u8 <= self.console_level.load(Ordering::Acquire)
    }
}
