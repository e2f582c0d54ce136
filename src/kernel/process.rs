//! 进程中与 I/O 和映像装载相关的状态

use crate::vfs::{FDTable, FileLockTable};
use core::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

/// 进程标识
pub type Pid = i32;

/// 进程
///
/// 进程独占自己的描述符表；fork 时复制而不是共享。
#[derive(Debug)]
pub struct Process {
    pid: Pid,
    /// 控制终端编号
    tty: usize,
    fd_table: FDTable,
    /// 初始堆的上界，由映像装载器设置
    program_break: AtomicUsize,
    /// 最近一次失败的系统调用留下的错误码（正值）
    last_error: AtomicI32,
}

impl Process {
    pub fn new(pid: Pid, tty: usize) -> Self {
        Self {
            pid,
            tty,
            fd_table: FDTable::new(pid),
            program_break: AtomicUsize::new(0),
            last_error: AtomicI32::new(0),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn tty(&self) -> usize {
        self.tty
    }

    pub fn fd_table(&self) -> &FDTable {
        &self.fd_table
    }

    pub fn program_break(&self) -> usize {
        self.program_break.load(Ordering::Acquire)
    }

    pub fn set_program_break(&self, brk: usize) {
        self.program_break.store(brk, Ordering::Release);
    }

    pub fn last_error(&self) -> i32 {
        self.last_error.load(Ordering::Relaxed)
    }

    pub fn set_last_error(&self, errno: i32) {
        self.last_error.store(errno, Ordering::Relaxed);
    }

    /// 创建子进程：继承终端与堆上界，描述符表逐项复制
    pub fn fork(&self, child: Pid) -> Process {
        Process {
            pid: child,
            tty: self.tty,
            fd_table: self.fd_table.clone_table(child),
            program_break: AtomicUsize::new(self.program_break()),
            last_error: AtomicI32::new(0),
        }
    }

    /// 进程退出：关闭所有描述符并释放持有的文件锁
    pub fn exit(&self, locks: &FileLockTable) {
        self.fd_table.close_all();
        let released = locks.release_all(self.pid);
        if released > 0 {
            crate::pr_debug!("pid {} exited holding {} file locks", self.pid, released);
        }
    }
}
