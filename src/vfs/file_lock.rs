//! 全局文件锁表
//!
//! 固定槽位的表，记录哪个进程以独占方式打开了哪个节点。
//! 一个节点至多占用一个槽位，只有显式解锁或持有者退出时才释放。

use crate::config::GLOBAL_FILE_TABLE_SIZE;
use crate::kernel::Pid;
use crate::pr_warn;
use crate::sync::SpinLock;
use crate::vfs::{FsError, NodeId};
use alloc::vec;
use alloc::vec::Vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LockSlot {
    node: NodeId,
    pid: Pid,
}

pub struct FileLockTable {
    slots: SpinLock<Vec<Option<LockSlot>>>,
}

impl FileLockTable {
    pub fn new() -> Self {
        Self::with_capacity(GLOBAL_FILE_TABLE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: SpinLock::new(vec![None; capacity]),
        }
    }

    /// 为 `pid` 锁定节点，返回槽位下标
    ///
    /// - 持有者重复加锁返回已有的下标
    /// - 其它进程持有时返回 WouldBlock
    /// - 表满时返回 FileTableOverflow (ENFILE)
    pub fn lock_file(&self, node: NodeId, pid: Pid) -> Result<usize, FsError> {
        self.try_lock_file(node, pid).map(|(index, _)| index)
    }

    /// 同 [`FileLockTable::lock_file`]，另外返回这次调用是否新占用了槽位
    ///
    /// 只有新占用的锁才能在后续步骤失败时回滚。
    pub fn try_lock_file(&self, node: NodeId, pid: Pid) -> Result<(usize, bool), FsError> {
        let mut slots = self.slots.lock();

        if let Some((index, slot)) = find(&slots, node) {
            return if slot.pid == pid {
                Ok((index, false))
            } else {
                Err(FsError::WouldBlock)
            };
        }

        let Some(index) = slots.iter().position(|slot| slot.is_none()) else {
            pr_warn!("global file lock table is full ({} slots)", slots.len());
            return Err(FsError::FileTableOverflow);
        };
        slots[index] = Some(LockSlot { node, pid });
        Ok((index, true))
    }

    pub fn find_locked_file(&self, node: NodeId) -> Option<usize> {
        find(&self.slots.lock(), node).map(|(index, _)| index)
    }

    /// 当前持有该节点的进程
    pub fn holder(&self, node: NodeId) -> Option<Pid> {
        find(&self.slots.lock(), node).map(|(_, slot)| slot.pid)
    }

    pub fn unlock_file(&self, index: usize) -> Result<(), FsError> {
        let mut slots = self.slots.lock();
        match slots.get_mut(index) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                Ok(())
            }
            _ => Err(FsError::InvalidArgument),
        }
    }

    /// 释放 `pid` 持有的全部锁，返回释放的数量
    pub fn release_all(&self, pid: Pid) -> usize {
        let mut slots = self.slots.lock();
        let mut released = 0;
        for slot in slots.iter_mut() {
            if matches!(slot, Some(held) if held.pid == pid) {
                *slot = None;
                released += 1;
            }
        }
        released
    }
}

impl Default for FileLockTable {
    fn default() -> Self {
        Self::new()
    }
}

fn find(slots: &[Option<LockSlot>], node: NodeId) -> Option<(usize, LockSlot)> {
    slots.iter().enumerate().find_map(|(index, slot)| match slot {
        Some(held) if held.node == node => Some((index, *held)),
        _ => None,
    })
}
