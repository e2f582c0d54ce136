//! Logging configuration

use super::level::LogLevel;

/// Number of entries kept in a log buffer before the oldest is dropped
pub const LOG_BUFFER_ENTRIES: usize = 64;

/// Maximum length of a single log message
pub const MAX_LOG_MESSAGE_LENGTH: usize = 256;

/// Default log level
pub const DEFAULT_LOG_LEVEL: LogLevel = LogLevel::Info;

/// Default console level
pub const DEFAULT_CONSOLE_LEVEL: LogLevel = LogLevel::Warning;
