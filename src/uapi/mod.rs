//! 用户可见的 ABI 定义
pub mod errno;
pub mod fcntl;
pub mod fs;
