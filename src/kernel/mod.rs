//! 内核模块
//!
//! 进程、调度器接口、子系统上下文、映像装载与系统调用入口

mod context;
mod process;
mod scheduler;

pub mod exec_loader;
pub mod syscall;

pub use context::KernelContext;
pub use exec_loader::{ElfRejection, ExecError, execute, load_image};
pub use process::{Pid, Process};
pub use scheduler::{Scheduler, Tid, WaitQueue};
