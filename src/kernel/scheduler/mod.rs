//! 调度器接口
//!
//! 本子系统不实现调度，只通过 [`Scheduler`] 使用启动流程注入的调度器：
//! 查询当前任务与进程、挂起当前任务、唤醒指定任务。
mod wait_queue;

pub use wait_queue::WaitQueue;

use crate::kernel::Process;
use alloc::sync::Arc;

/// 任务标识
pub type Tid = u32;

/// 调度器协作者
///
/// 唤醒语义与 park/unpark 一致：在 [`Scheduler::block_current`] 之前送达的
/// [`Scheduler::wake`] 不会丢失，下一次阻塞立即返回。阻塞也可能无故返回，
/// 因此等待者醒来后必须在锁内重新检查条件。
pub trait Scheduler: Send + Sync {
    fn current_tid(&self) -> Tid;

    /// 当前任务所属的进程；内核早期或中断上下文中可能没有
    fn current_process(&self) -> Option<Arc<Process>>;

    /// 挂起当前任务直到被唤醒
    fn block_current(&self);

    fn wake(&self, tid: Tid);
}
