//! 文件描述符表
//!
//! 每个进程独占一个 [`FDTable`]。表项 [`FdEntry`] 持有节点的 `Arc` 引用以及
//! 本次打开的游标、fd 标志和打开模式。关闭只清空槽位，槽位随后可被复用。
//!
//! 每装入一个表项，节点的打开计数加一；清空表项时减一，减到零时在
//! 释放表锁之后调用节点的 close 操作。

use crate::config::DEFAULT_MAX_FDS;
use crate::kernel::Pid;
use crate::sync::SpinLock;
use crate::uapi::fcntl::FdFlags;
use crate::vfs::{DirStream, FsError, NodeType, OpenFlags, VfsNode};
use crate::{pr_debug, pr_warn};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

/// 描述符游标
///
/// 普通节点是字节偏移；目录节点在打开时换成目录流句柄。
/// 复制描述符时目录流句柄被共享，与复制前指向同一个流。
#[derive(Clone, Debug)]
pub enum FdCursor {
    Offset(usize),
    Directory(Arc<SpinLock<DirStream>>),
}

/// 文件描述符表项
#[derive(Clone)]
pub struct FdEntry {
    pub owner: Pid,
    pub node: Arc<VfsNode>,
    pub cursor: FdCursor,
    pub flags: FdFlags,
    pub mode: OpenFlags,
}

impl FdEntry {
    pub fn offset(&self) -> usize {
        match self.cursor {
            FdCursor::Offset(off) => off,
            FdCursor::Directory(_) => 0,
        }
    }

    pub fn dir_stream(&self) -> Option<&Arc<SpinLock<DirStream>>> {
        match &self.cursor {
            FdCursor::Directory(stream) => Some(stream),
            FdCursor::Offset(_) => None,
        }
    }
}

impl fmt::Debug for FdEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FdEntry")
            .field("owner", &self.owner)
            .field("node", &self.node.name())
            .field("cursor", &self.cursor)
            .field("flags", &self.flags)
            .field("mode", &self.mode)
            .finish()
    }
}

/// 文件描述符表
pub struct FDTable {
    owner: Pid,
    /// None 表示该 fd 未使用
    entries: SpinLock<Vec<Option<FdEntry>>>,
    max_fds: usize,
}

impl fmt::Debug for FDTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        let used = entries.iter().filter(|slot| slot.is_some()).count();
        f.debug_struct("FDTable")
            .field("owner", &self.owner)
            .field("max_fds", &self.max_fds)
            .field("slots", &entries.len())
            .field("used", &used)
            .finish()
    }
}

impl FDTable {
    pub fn new(owner: Pid) -> Self {
        Self::with_capacity(owner, DEFAULT_MAX_FDS)
    }

    pub fn with_capacity(owner: Pid, max_fds: usize) -> Self {
        Self {
            owner,
            entries: SpinLock::new(Vec::new()),
            max_fds,
        }
    }

    pub fn owner(&self) -> Pid {
        self.owner
    }

    pub fn max_fds(&self) -> usize {
        self.max_fds
    }

    /// 为节点登记一个新的描述符，返回最小的空闲 fd
    pub fn register(
        &self,
        node: Arc<VfsNode>,
        flags: FdFlags,
        mode: OpenFlags,
    ) -> Result<usize, FsError> {
        self.register_with_cursor(node, flags, mode, FdCursor::Offset(0))
    }

    pub fn register_with_cursor(
        &self,
        node: Arc<VfsNode>,
        flags: FdFlags,
        mode: OpenFlags,
        cursor: FdCursor,
    ) -> Result<usize, FsError> {
        let entry = FdEntry {
            owner: self.owner,
            node,
            cursor,
            flags,
            mode,
        };
        self.install_lowest(entry, 0)
    }

    /// 把表项放进 >= min_fd 的最小空闲槽位
    fn install_lowest(&self, entry: FdEntry, min_fd: usize) -> Result<usize, FsError> {
        let mut entries = self.entries.lock();

        let free = entries
            .iter()
            .enumerate()
            .skip(min_fd)
            .find(|(_, slot)| slot.is_none())
            .map(|(fd, _)| fd);

        let fd = match free {
            Some(fd) => fd,
            None => entries.len().max(min_fd),
        };
        if fd >= self.max_fds {
            pr_warn!(
                "fd table of pid {} is full ({} entries)",
                self.owner,
                self.max_fds
            );
            return Err(FsError::TooManyOpenFiles);
        }

        if entries.len() <= fd {
            entries.resize(fd + 1, None);
        }
        entry.node.attach(entry.mode);
        entries[fd] = Some(entry);
        Ok(fd)
    }

    pub fn get(&self, fd: usize) -> Result<FdEntry, FsError> {
        let entries = self.entries.lock();
        entries
            .get(fd)
            .and_then(|slot| slot.clone())
            .ok_or(FsError::BadFileDescriptor)
    }

    pub fn get_node(&self, fd: usize) -> Result<Arc<VfsNode>, FsError> {
        self.get(fd).map(|entry| entry.node)
    }

    /// 按表顺序查找第一个引用该节点的描述符
    pub fn get_by_node(&self, node: &Arc<VfsNode>) -> Result<(usize, FdEntry), FsError> {
        let entries = self.entries.lock();
        entries
            .iter()
            .enumerate()
            .find_map(|(fd, slot)| match slot {
                Some(entry) if Arc::ptr_eq(&entry.node, node) => Some((fd, entry.clone())),
                _ => None,
            })
            .ok_or(FsError::BadFileDescriptor)
    }

    /// 关闭描述符；fd 无效或已关闭时什么也不做
    pub fn close(&self, fd: usize) {
        let taken = {
            let mut entries = self.entries.lock();
            entries.get_mut(fd).and_then(|slot| slot.take())
        };
        if let Some(entry) = taken {
            release_entry(&entry);
        }
    }

    /// 复制描述符
    ///
    /// `target` 为空时放入最小空闲槽位；否则恰好写入 `target`，
    /// 必要时扩展表，`target` 上原有的描述符先被关闭。
    /// 新描述符不继承 CLOEXEC。
    pub fn dup(&self, fd: usize, target: Option<usize>) -> Result<usize, FsError> {
        let mut entry = self.get(fd)?;
        entry.flags.remove(FdFlags::CLOEXEC);

        match target {
            None => self.install_lowest(entry, 0),
            Some(target) if target == fd => Ok(fd),
            Some(target) => self.install_at(target, entry),
        }
    }

    /// F_DUPFD 语义：新 fd 是 >= min_fd 的最小空闲描述符
    pub fn dup_from(&self, fd: usize, min_fd: usize, flags: FdFlags) -> Result<usize, FsError> {
        let mut entry = self.get(fd)?;
        entry.flags = flags;
        self.install_lowest(entry, min_fd)
    }

    /// 让 `new_fd` 成为 `old_fd` 的副本，保留 `new_fd` 的编号
    pub fn dup2(&self, old_fd: usize, new_fd: usize) -> Result<usize, FsError> {
        if old_fd == new_fd {
            self.get(old_fd)?;
            return Ok(new_fd);
        }
        self.dup(old_fd, Some(new_fd))
    }

    /// 在指定槽位安装表项，原占用者先被关闭
    fn install_at(&self, fd: usize, entry: FdEntry) -> Result<usize, FsError> {
        if fd >= self.max_fds {
            return Err(FsError::BadFileDescriptor);
        }

        entry.node.attach(entry.mode);
        let old = {
            let mut entries = self.entries.lock();
            if entries.len() <= fd {
                entries.resize(fd + 1, None);
            }
            entries[fd].replace(entry)
        };
        if let Some(old) = old {
            release_entry(&old);
        }
        Ok(fd)
    }

    /// 获取文件描述符标志 (F_GETFD)
    pub fn get_flags(&self, fd: usize) -> Result<FdFlags, FsError> {
        self.get(fd).map(|entry| entry.flags)
    }

    /// 设置文件描述符标志 (F_SETFD)
    pub fn set_flags(&self, fd: usize, flags: FdFlags) -> Result<(), FsError> {
        self.with_entry(fd, |entry| entry.flags = flags)
    }

    /// 获取打开模式 (F_GETFL)
    pub fn get_mode(&self, fd: usize) -> Result<OpenFlags, FsError> {
        self.get(fd).map(|entry| entry.mode)
    }

    /// 修改状态位 (F_SETFL)，访问模式保持不变
    pub fn set_status_flags(&self, fd: usize, status: OpenFlags) -> Result<(), FsError> {
        let mask = OpenFlags::status_mask();
        self.with_entry(fd, |entry| {
            entry.mode = (entry.mode - mask) | (status & mask);
        })
    }

    /// 更新字节游标，目录流描述符不受影响
    pub fn set_offset(&self, fd: usize, offset: usize) -> Result<(), FsError> {
        self.with_entry(fd, |entry| {
            if let FdCursor::Offset(off) = &mut entry.cursor {
                *off = offset;
            }
        })
    }

    fn with_entry(&self, fd: usize, f: impl FnOnce(&mut FdEntry)) -> Result<(), FsError> {
        let mut entries = self.entries.lock();
        match entries.get_mut(fd) {
            Some(Some(entry)) => {
                f(entry);
                Ok(())
            }
            _ => Err(FsError::BadFileDescriptor),
        }
    }

    /// 关闭所有带 CLOEXEC 标志的描述符（用于 exec）
    pub fn close_exec(&self) {
        self.close_matching(|entry| entry.flags.contains(FdFlags::CLOEXEC));
    }

    /// 关闭全部描述符（进程退出）
    pub fn close_all(&self) {
        self.close_matching(|_| true);
    }

    fn close_matching(&self, pred: impl Fn(&FdEntry) -> bool) {
        let closed: Vec<FdEntry> = {
            let mut entries = self.entries.lock();
            entries
                .iter_mut()
                .filter(|slot| matches!(slot, Some(entry) if pred(entry)))
                .filter_map(|slot| slot.take())
                .collect()
        };
        for entry in closed {
            release_entry(&entry);
        }
    }

    /// 复制整张表（用于 fork）
    ///
    /// 子进程得到独立的表和独立的字节游标，节点引用被共享且打开计数递增。
    pub fn clone_table(&self, child: Pid) -> Self {
        let entries: Vec<Option<FdEntry>> = self
            .entries
            .lock()
            .iter()
            .map(|slot| {
                slot.as_ref().map(|entry| {
                    entry.node.attach(entry.mode);
                    FdEntry {
                        owner: child,
                        ..entry.clone()
                    }
                })
            })
            .collect();
        Self {
            owner: child,
            entries: SpinLock::new(entries),
            max_fds: self.max_fds,
        }
    }

    /// 当前打开的描述符数量
    pub fn open_count(&self) -> usize {
        self.entries.lock().iter().filter(|slot| slot.is_some()).count()
    }

    /// 通过 pr_debug! 输出整张表
    pub fn dump(&self) {
        let entries = self.entries.lock();
        pr_debug!("fd table of pid {}: {} slots", self.owner, entries.len());
        for (fd, slot) in entries.iter().enumerate() {
            if let Some(entry) = slot {
                let kind = match entry.node.node_type() {
                    NodeType::Directory => "dir",
                    NodeType::Pipe => "pipe",
                    NodeType::CharDevice => "chr",
                    _ => "file",
                };
                pr_debug!(
                    "  fd {}: {} [{}] off={} flags={:?} mode={:?}",
                    fd,
                    entry.node.name(),
                    kind,
                    entry.offset(),
                    entry.flags,
                    entry.mode
                );
            }
        }
    }
}

/// 表项被清空后调用，最后一个引用触发节点的 close 操作
fn release_entry(entry: &FdEntry) {
    let node = &entry.node;
    if !node.detach(entry.mode) {
        return;
    }
    match node.close() {
        Ok(()) | Err(FsError::NotSupported) => {}
        Err(e) => pr_warn!("close of node '{}' failed: {:?}", node.name(), e),
    }
}
