//! 进程执行与 I/O 子系统
//!
//! 负责把静态链接的可执行映像装入进程地址空间，并为进程提供 I/O 接口：
//! 文件描述符表、按节点类型分派的 VFS 节点，以及基于阻塞环形缓冲区的管道。
//!
//! 外部协作者（调度器、内存管理器、TTY、串口、具体文件系统驱动）通过 trait 注入，
//! 由启动流程构造 [`kernel::KernelContext`] 并传入本子系统。
#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[cfg(test)]
#[macro_use]
mod test;

#[macro_use]
pub mod log;

pub mod config;
pub mod device;
pub mod ipc;
pub mod kernel;
pub mod mm;
pub mod sync;
pub mod uapi;
pub mod util;
pub mod vfs;
