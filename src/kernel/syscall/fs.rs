//! 文件相关的系统调用

use super::{complete, current, fd_arg};
use crate::kernel::KernelContext;
use crate::uapi::fcntl::{FcntlCmd, FdFlags};
use crate::vfs::{FsError, OpenFlags, read_directory_entries};

pub fn open(ctx: &KernelContext, path: &str, flags: u32) -> isize {
    complete(ctx, do_open(ctx, path, flags))
}

fn do_open(ctx: &KernelContext, path: &str, flags: u32) -> Result<usize, FsError> {
    let flags = OpenFlags::from_bits(flags).ok_or(FsError::InvalidArgument)?;
    let process = current(ctx)?;
    ctx.open(&process, path, flags)
}

/// 关闭描述符；关闭未打开的描述符不算错误
pub fn close(ctx: &KernelContext, fd: i32) -> isize {
    let result = current(ctx).map(|process| {
        if let Ok(fd) = fd_arg(fd) {
            process.fd_table().close(fd);
        }
        0
    });
    complete(ctx, result)
}

/// 读取目录项到 `buf`，返回写入的字节数，读完返回 0
pub fn getdents(ctx: &KernelContext, fd: i32, buf: &mut [u8]) -> isize {
    let result = current(ctx)
        .and_then(|process| read_directory_entries(process.fd_table(), fd_arg(fd)?, buf));
    complete(ctx, result)
}

pub fn fcntl(ctx: &KernelContext, fd: i32, cmd: i32, arg: usize) -> isize {
    complete(ctx, do_fcntl(ctx, fd, cmd, arg))
}

fn do_fcntl(ctx: &KernelContext, fd: i32, cmd: i32, arg: usize) -> Result<usize, FsError> {
    let process = current(ctx)?;
    let table = process.fd_table();
    let fd = fd_arg(fd)?;
    match FcntlCmd::from_raw(cmd).ok_or(FsError::InvalidArgument)? {
        FcntlCmd::DupFd => table.dup_from(fd, arg, FdFlags::empty()),
        FcntlCmd::GetFd => table.get_flags(fd).map(|f| f.bits() as usize),
        FcntlCmd::SetFd => {
            table.set_flags(fd, FdFlags::from_bits_truncate(arg as u32))?;
            Ok(0)
        }
        FcntlCmd::GetFl => table.get_mode(fd).map(|m| m.bits() as usize),
        FcntlCmd::SetFl => {
            table.set_status_flags(fd, OpenFlags::from_bits_truncate(arg as u32))?;
            Ok(0)
        }
    }
}
