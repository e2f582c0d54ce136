//! 读写系统调用
//!
//! 普通文件按描述符的游标读写并推进游标；管道和字符设备忽略游标。

use super::{complete, current, fd_arg};
use crate::kernel::KernelContext;
use crate::vfs::{FsError, NodeType, OpenFlags};

pub fn read(ctx: &KernelContext, fd: i32, buf: &mut [u8]) -> isize {
    complete(ctx, do_read(ctx, fd, buf))
}

fn do_read(ctx: &KernelContext, fd: i32, buf: &mut [u8]) -> Result<usize, FsError> {
    let process = current(ctx)?;
    let table = process.fd_table();
    let fd = fd_arg(fd)?;
    let entry = table.get(fd)?;
    if !entry.mode.readable() {
        return Err(FsError::BadFileDescriptor);
    }
    if entry.node.node_type() == NodeType::Directory {
        return Err(FsError::IsDirectory);
    }

    let offset = entry.offset();
    let n = entry.node.read(offset, buf, entry.mode)?;
    if entry.node.node_type() == NodeType::File {
        table.set_offset(fd, offset + n)?;
    }
    Ok(n)
}

pub fn write(ctx: &KernelContext, fd: i32, buf: &[u8]) -> isize {
    complete(ctx, do_write(ctx, fd, buf))
}

fn do_write(ctx: &KernelContext, fd: i32, buf: &[u8]) -> Result<usize, FsError> {
    let process = current(ctx)?;
    let table = process.fd_table();
    let fd = fd_arg(fd)?;
    let entry = table.get(fd)?;
    if !entry.mode.writable() {
        return Err(FsError::BadFileDescriptor);
    }

    let is_file = entry.node.node_type() == NodeType::File;
    let offset = if is_file && entry.mode.contains(OpenFlags::O_APPEND) {
        entry.node.size()
    } else {
        entry.offset()
    };
    let n = entry.node.write(offset, buf, entry.mode)?;
    if is_file {
        table.set_offset(fd, offset + n)?;
    }
    Ok(n)
}
