use super::level::LogLevel;
use super::log_core::LogCore;

/// 直接驱动独立的 LogCore 实例，不经过全局宏
macro_rules! test_log {
    ($logger:expr, $level:expr, $($arg:tt)*) => {
        $logger._log($level, format_args!($($arg)*))
    };
}
