//! 进程映像相关的系统调用

use super::{current, fail};
use crate::kernel::{KernelContext, execute};
use crate::mm::AddressSpace;

/// 用 `image` 替换当前进程的映像，成功时返回入口地址
///
/// 映像被拒绝时进程保持原样，close-on-exec 描述符也不会被关闭。
pub fn execve(ctx: &KernelContext, image: &[u8], space: &mut dyn AddressSpace) -> isize {
    let process = match current(ctx) {
        Ok(p) => p,
        Err(e) => return fail(ctx, e.errno()),
    };
    match execute(&process, image, space) {
        Ok(entry) => entry as isize,
        Err(e) => fail(ctx, e.errno()),
    }
}
