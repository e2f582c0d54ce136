//! 系统调用入口
//!
//! 这一层是错误变成返回值的唯一地方：失败时把正的 errno 记到调用进程的
//! last_error 上，并返回负的 errno。描述符参数是 i32，负数按 EBADF 处理。

mod fs;
mod io;
mod ipc;
mod task;

pub use fs::{close, fcntl, getdents, open};
pub use io::{read, write};
pub use ipc::{dup, dup2, mkfifo, pipe, pipe2};
pub use task::execve;

use alloc::sync::Arc;

use crate::kernel::{KernelContext, Process};
use crate::vfs::FsError;

/// 当前进程；没有进程上下文时任何描述符都无效
fn current(ctx: &KernelContext) -> Result<Arc<Process>, FsError> {
    ctx.current_process().ok_or(FsError::BadFileDescriptor)
}

fn fd_arg(fd: i32) -> Result<usize, FsError> {
    usize::try_from(fd).map_err(|_| FsError::BadFileDescriptor)
}

/// 记录错误并返回负的 errno
fn fail(ctx: &KernelContext, errno: i32) -> isize {
    if let Some(process) = ctx.current_process() {
        process.set_last_error(errno);
    }
    -(errno as isize)
}

fn complete(ctx: &KernelContext, result: Result<usize, FsError>) -> isize {
    match result {
        Ok(v) => v as isize,
        Err(e) => fail(ctx, e.errno()),
    }
}
