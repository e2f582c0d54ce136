//! 内核日志
//!
//! 提供 Linux 风格的 `pr_*` 宏。日志先经全局级别过滤后写入有界缓冲区，
//! 满足控制台级别的条目再交给启动时安装的 [`LogSink`] 立即输出。

pub mod buffer;
pub mod config;
mod context;
pub mod entry;
pub mod level;
mod log_core;
pub mod macros;

#[cfg(test)]
mod tests;

use alloc::sync::Arc;
use spin::RwLock;

pub use entry::LogEntry;
pub use level::LogLevel;
pub use log_core::LogCore;

/// 控制台输出端，由启动流程提供（通常是串口）
pub trait LogSink: Send + Sync {
    fn write_entry(&self, entry: &LogEntry);
}

static GLOBAL_LOG: LogCore = LogCore::default();

static CONSOLE_SINK: RwLock<Option<Arc<dyn LogSink>>> = RwLock::new(None);

/// 安装控制台输出端；未安装时控制台级别的日志只进入缓冲区
pub fn set_console_sink(sink: Arc<dyn LogSink>) {
    *CONSOLE_SINK.write() = Some(sink);
}

pub fn clear_console_sink() {
    *CONSOLE_SINK.write() = None;
}

fn emit_to_console(entry: &LogEntry) {
    if let Some(sink) = CONSOLE_SINK.read().as_ref() {
        sink.write_entry(entry);
    }
}

#[doc(hidden)]
pub fn log_impl(level: LogLevel, args: core::fmt::Arguments) {
    GLOBAL_LOG._log(level, args);
}

#[doc(hidden)]
#[inline(always)]
pub fn is_level_enabled(level: LogLevel) -> bool {
    GLOBAL_LOG.is_level_enabled(level)
}

pub fn read_log() -> Option<LogEntry> {
    GLOBAL_LOG._read_log()
}

pub fn log_len() -> usize {
    GLOBAL_LOG._log_len()
}

pub fn log_dropped_count() -> usize {
    GLOBAL_LOG._log_dropped_count()
}

pub fn set_global_level(level: LogLevel) {
    GLOBAL_LOG._set_global_level(level);
}

pub fn get_global_level() -> LogLevel {
    GLOBAL_LOG._get_global_level()
}

pub fn set_console_level(level: LogLevel) {
    GLOBAL_LOG._set_console_level(level);
}

pub fn get_console_level() -> LogLevel {
    GLOBAL_LOG._get_console_level()
}
