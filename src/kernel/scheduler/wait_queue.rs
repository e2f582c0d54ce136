//! 等待队列模块
//!
//! 记录在某个事件上等待的任务。等待者必须在持有被保护数据的锁时入队，
//! 放锁之后再阻塞；生产者在锁内修改数据后收集等待者，放锁后逐个唤醒。
use super::{Scheduler, Tid};
use crate::sync::SpinLock;
use alloc::collections::VecDeque;
use alloc::vec::Vec;

#[derive(Debug, Default)]
pub struct WaitQueue {
    tasks: SpinLock<VecDeque<Tid>>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self {
            tasks: SpinLock::new(VecDeque::new()),
        }
    }

    /// 将任务加入等待队列（不阻塞），已在队列中的任务不会重复加入
    pub fn add_task(&self, tid: Tid) {
        let mut tasks = self.tasks.lock();
        if !tasks.contains(&tid) {
            tasks.push_back(tid);
        }
    }

    /// 从等待队列中移除指定任务（不唤醒）
    pub fn remove_task(&self, tid: Tid) {
        self.tasks.lock().retain(|&t| t != tid);
    }

    pub fn contains(&self, tid: Tid) -> bool {
        self.tasks.lock().contains(&tid)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// 唤醒队首一个任务：在临界区内 pop，然后在临界区外唤醒
    pub fn wake_up_one(&self, sched: &dyn Scheduler) -> bool {
        let maybe_task = self.tasks.lock().pop_front();
        match maybe_task {
            Some(tid) => {
                sched.wake(tid);
                true
            }
            None => false,
        }
    }

    /// 唤醒队列中所有任务，返回唤醒的数量
    pub fn wake_up_all(&self, sched: &dyn Scheduler) -> usize {
        let to_wake: Vec<Tid> = self.tasks.lock().drain(..).collect();
        for &tid in &to_wake {
            sched.wake(tid);
        }
        to_wake.len()
    }
}
