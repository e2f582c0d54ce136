//! 跨模块场景测试：上下文、标准流、目录枚举与系统调用入口
use crate::kernel::{KernelContext, Process};
use crate::test::doubles::{CaptureSerial, CaptureTerminal, MemFs, ThreadScheduler};
use crate::vfs::FsType;
use alloc::sync::Arc;

/// 测试夹具：一个装好内存文件系统的上下文，当前进程 pid 1，控制终端 3
pub struct Fixture {
    pub ctx: KernelContext,
    pub sched: Arc<ThreadScheduler>,
    pub terminal: Arc<CaptureTerminal>,
    pub serial: Arc<CaptureSerial>,
    pub fs: Arc<MemFs>,
    pub process: Arc<Process>,
}

pub const TTY: usize = 3;

pub fn fixture() -> Fixture {
    let sched = Arc::new(ThreadScheduler::new());
    let terminal = CaptureTerminal::new();
    let serial = CaptureSerial::new();
    let ctx = KernelContext::new(sched.clone(), terminal.clone(), serial.clone());

    let fs = MemFs::new();
    ctx.register_filesystem("memfs", FsType::Ram, fs.clone());

    let process = Arc::new(Process::new(1, TTY));
    sched.set_current_process(Some(process.clone()));

    Fixture {
        ctx,
        sched,
        terminal,
        serial,
        fs,
        process,
    }
}

mod syscall;
