//! constants for the subsystem (platform-independent)

// about memory management
pub const PAGE_SIZE: usize = 4096;

// about file descriptors
/// 单个进程文件描述符表的硬上限
pub const DEFAULT_MAX_FDS: usize = 256;
/// 全局文件锁表槽位数
pub const GLOBAL_FILE_TABLE_SIZE: usize = 64;
/// 文件名最大长度
pub const MAX_NAME_LEN: usize = 255;

// about pipes
/// 管道环形缓冲区默认容量
pub const PIPE_BUFFER_SIZE: usize = 4096;

// about the standard streams
/// stdin 行缓冲大小，满一行或遇到换行时推入管道
pub const STDIN_LINE_BUFSIZ: usize = 1024;
