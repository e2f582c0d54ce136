//! 描述符复制与管道相关的系统调用

use super::{complete, current, fd_arg};
use crate::ipc::{create_pipe, make_fifo};
use crate::kernel::KernelContext;
use crate::vfs::{FsError, OpenFlags};

pub fn dup(ctx: &KernelContext, fd: i32) -> isize {
    let result = current(ctx).and_then(|process| process.fd_table().dup(fd_arg(fd)?, None));
    complete(ctx, result)
}

pub fn dup2(ctx: &KernelContext, old_fd: i32, new_fd: i32) -> isize {
    let result = current(ctx)
        .and_then(|process| process.fd_table().dup2(fd_arg(old_fd)?, fd_arg(new_fd)?));
    complete(ctx, result)
}

pub fn pipe(ctx: &KernelContext, fds: &mut [i32; 2]) -> isize {
    pipe2(ctx, fds, 0)
}

/// 创建匿名管道，`fds[0]` 为读端，`fds[1]` 为写端
///
/// `flags` 只接受 O_CLOEXEC 和 O_NONBLOCK。
pub fn pipe2(ctx: &KernelContext, fds: &mut [i32; 2], flags: u32) -> isize {
    complete(ctx, do_pipe2(ctx, fds, flags))
}

fn do_pipe2(ctx: &KernelContext, fds: &mut [i32; 2], flags: u32) -> Result<usize, FsError> {
    let valid = OpenFlags::O_CLOEXEC | OpenFlags::O_NONBLOCK;
    if flags & !valid.bits() != 0 {
        return Err(FsError::InvalidArgument);
    }
    let process = current(ctx)?;
    let (read_fd, write_fd) = create_pipe(
        process.fd_table(),
        ctx.scheduler().clone(),
        OpenFlags::from_bits_truncate(flags),
    )?;
    fds[0] = read_fd as i32;
    fds[1] = write_fd as i32;
    Ok(0)
}

pub fn mkfifo(ctx: &KernelContext, path: &str) -> isize {
    let result = make_fifo(ctx.namespace(), ctx.scheduler().clone(), path).map(|_| 0);
    complete(ctx, result)
}
