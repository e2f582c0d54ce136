//! VFS 错误类型
//!
//! 与 POSIX 兼容的错误码，可通过 [`FsError::to_errno()`] 转换为系统调用错误码。

use crate::uapi::errno::*;

/// VFS 错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    // 文件/目录相关
    NotFound,      // -ENOENT(2): 文件不存在
    AlreadyExists, // -EEXIST(17): 文件已存在
    NotDirectory,  // -ENOTDIR(20): 不是目录
    IsDirectory,   // -EISDIR(21): 是目录

    // 权限相关
    PermissionDenied, // -EACCES(13): 权限被拒绝

    // 文件描述符相关
    BadFileDescriptor, // -EBADF(9): 无效的文件描述符
    TooManyOpenFiles,  // -EMFILE(24): 进程 fd 表已满
    FileTableOverflow, // -ENFILE(23): 全局锁表已满

    // 参数相关
    InvalidArgument, // -EINVAL(22): 无效参数
    NameTooLong,     // -ENAMETOOLONG(36): 文件名过长

    IoError, // -EIO(5): 驱动报告的 I/O 错误

    // 管道相关
    BrokenPipe, // -EPIPE(32): 管道已销毁
    WouldBlock, // -EAGAIN(11): 非阻塞操作将阻塞

    NotSupported, // -ENOTSUP(95): 节点未提供该操作
}

impl FsError {
    /// 正值错误码，写入进程的 last_error
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound => ENOENT,
            FsError::AlreadyExists => EEXIST,
            FsError::NotDirectory => ENOTDIR,
            FsError::IsDirectory => EISDIR,
            FsError::PermissionDenied => EACCES,
            FsError::BadFileDescriptor => EBADF,
            FsError::TooManyOpenFiles => EMFILE,
            FsError::FileTableOverflow => ENFILE,
            FsError::InvalidArgument => EINVAL,
            FsError::NameTooLong => ENAMETOOLONG,
            FsError::IoError => EIO,
            FsError::BrokenPipe => EPIPE,
            FsError::WouldBlock => EAGAIN,
            FsError::NotSupported => ENOTSUP,
        }
    }

    /// 转换为系统调用错误码（负数）
    pub fn to_errno(&self) -> isize {
        -(self.errno() as isize)
    }
}
