//! 子系统上下文
//!
//! 启动流程构造一个 [`KernelContext`]，把调度器、终端、串口注入进来，
//! 再把它传给系统调用层。命名空间、全局锁表和当前激活的文件系统都归它所有，
//! 不存在全局单例。

use alloc::string::String;
use alloc::sync::Arc;

use hashbrown::HashMap;
use spin::RwLock;

use crate::device::{SerialPort, Terminal};
use crate::kernel::{Process, Scheduler};
use crate::sync::SpinLock;
use crate::uapi::fcntl::FdFlags;
use crate::vfs::{
    FdCursor, FileLockTable, FileSystemDriver, FsError, FsType, Namespace, NodeType, OpenFlags,
    RegisteredFs, VfsNode, normalize_path,
};
use crate::{pr_debug, pr_info, pr_warn};

pub struct KernelContext {
    scheduler: Arc<dyn Scheduler>,
    terminal: Arc<dyn Terminal>,
    serial: Arc<dyn SerialPort>,
    namespace: Namespace,
    lock_table: FileLockTable,
    filesystem: RwLock<Option<RegisteredFs>>,
    /// 由文件系统驱动创建的节点，同一路径总是得到同一个节点
    fs_nodes: SpinLock<HashMap<String, Arc<VfsNode>>>,
}

impl KernelContext {
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        terminal: Arc<dyn Terminal>,
        serial: Arc<dyn SerialPort>,
    ) -> Self {
        Self {
            scheduler,
            terminal,
            serial,
            namespace: Namespace::new(),
            lock_table: FileLockTable::new(),
            filesystem: RwLock::new(None),
            fs_nodes: SpinLock::new(HashMap::new()),
        }
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    pub fn terminal(&self) -> &Arc<dyn Terminal> {
        &self.terminal
    }

    pub fn serial(&self) -> &Arc<dyn SerialPort> {
        &self.serial
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn lock_table(&self) -> &FileLockTable {
        &self.lock_table
    }

    pub fn current_process(&self) -> Option<Arc<Process>> {
        self.scheduler.current_process()
    }

    /// 设置激活的文件系统，替换之前注册的驱动
    pub fn register_filesystem(
        &self,
        name: &str,
        fs_type: FsType,
        driver: Arc<dyn FileSystemDriver>,
    ) {
        let fs = RegisteredFs {
            name: String::from(name),
            fs_type,
            driver,
        };
        if let Some(old) = self.filesystem.write().replace(fs) {
            pr_info!("filesystem {} replaced", old.name);
        }
        self.fs_nodes.lock().clear();
        pr_info!("filesystem {} ({:?}) registered", name, fs_type);
    }

    pub fn filesystem(&self) -> Option<RegisteredFs> {
        self.filesystem.read().clone()
    }

    /// 解析路径：先查命名空间，再交给激活的文件系统
    pub fn lookup(&self, path: &str) -> Result<Arc<VfsNode>, FsError> {
        let path = normalize_path(path)?;
        match self.namespace.lookup(&path) {
            Err(FsError::NotFound) => {}
            found => return found,
        }

        if let Some(node) = self.fs_nodes.lock().get(&path) {
            return Ok(node.clone());
        }
        let fs = self.filesystem.read().clone().ok_or(FsError::NotFound)?;
        let node = Arc::new(fs.make_node(&path)?);
        self.fs_nodes.lock().insert(path, node.clone());
        Ok(node)
    }

    /// 打开路径并在 `process` 的描述符表中登记
    ///
    /// 目录以目录流作为游标；`O_EXLOCK` 会在全局锁表中为调用者锁住节点，
    /// 节点已被其他进程锁住时返回 WouldBlock。
    pub fn open(&self, process: &Process, path: &str, flags: OpenFlags) -> Result<usize, FsError> {
        let node = self.lookup(path)?;
        let is_dir = node.node_type() == NodeType::Directory;

        if flags.contains(OpenFlags::O_DIRECTORY) && !is_dir {
            return Err(FsError::NotDirectory);
        }
        let cursor = if is_dir {
            if flags.writable() {
                return Err(FsError::IsDirectory);
            }
            FdCursor::Directory(Arc::new(SpinLock::new(node.open_dir()?)))
        } else {
            FdCursor::Offset(0)
        };

        // 只记录这次新占用的锁；调用者原本就持有的锁不随失败释放
        let fresh_lock = if flags.contains(OpenFlags::O_EXLOCK) {
            match self.lock_table.try_lock_file(node.id(), process.pid())? {
                (index, true) => Some(index),
                (_, false) => None,
            }
        } else {
            None
        };

        let mode = flags - OpenFlags::O_CLOEXEC - OpenFlags::O_EXLOCK;
        let result = process.fd_table().register_with_cursor(
            node,
            FdFlags::from_open_flags(flags),
            mode,
            cursor,
        );
        match (result, fresh_lock) {
            (Err(e), Some(index)) => {
                if let Err(unlock) = self.lock_table.unlock_file(index) {
                    pr_warn!("rollback of lock slot {} failed: {:?}", index, unlock);
                }
                Err(e)
            }
            (result, _) => {
                if let Ok(fd) = result {
                    pr_debug!("pid {} opened {} as fd {}", process.pid(), path, fd);
                }
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::doubles::{CaptureSerial, CaptureTerminal, MemFs, ThreadScheduler};

    fn context() -> KernelContext {
        KernelContext::new(
            Arc::new(ThreadScheduler::new()),
            CaptureTerminal::new(),
            CaptureSerial::new(),
        )
    }

    test_case!(test_lookup_without_filesystem, {
        let ctx = context();
        kassert!(ctx.lookup("/etc/passwd").unwrap_err() == FsError::NotFound);
    });

    test_case!(test_lookup_consults_namespace_first, {
        let ctx = context();
        let fs = MemFs::new();
        fs.add_file("/fifo", b"from disk").unwrap();
        ctx.register_filesystem("mem", FsType::Ram, fs);

        crate::ipc::make_fifo(ctx.namespace(), ctx.scheduler().clone(), "/fifo").unwrap();
        kassert!(ctx.lookup("/fifo").unwrap().node_type() == NodeType::Pipe);
    });

    test_case!(test_filesystem_nodes_are_cached, {
        let ctx = context();
        let fs = MemFs::new();
        fs.add_file("/a.txt", b"x").unwrap();
        ctx.register_filesystem("mem", FsType::Ram, fs);

        let a = ctx.lookup("/a.txt").unwrap();
        let b = ctx.lookup("//a.txt").unwrap();
        kassert!(Arc::ptr_eq(&a, &b));
        kassert!(ctx.filesystem().unwrap().fs_type == FsType::Ram);
    });

    test_case!(test_open_directory_rules, {
        let ctx = context();
        let fs = MemFs::new();
        fs.add_dir("/bin").unwrap();
        fs.add_file("/readme", b"hello").unwrap();
        ctx.register_filesystem("mem", FsType::Ram, fs);
        let p = Process::new(1, 0);

        let fd = ctx.open(&p, "/bin", OpenFlags::O_RDONLY).unwrap();
        kassert!(p.fd_table().get(fd).unwrap().dir_stream().is_some());
        kassert!(ctx.open(&p, "/bin", OpenFlags::O_RDWR) == Err(FsError::IsDirectory));
        kassert!(
            ctx.open(&p, "/readme", OpenFlags::O_DIRECTORY) == Err(FsError::NotDirectory)
        );

        let fd = ctx
            .open(&p, "/readme", OpenFlags::O_RDONLY | OpenFlags::O_CLOEXEC)
            .unwrap();
        let entry = p.fd_table().get(fd).unwrap();
        kassert!(entry.flags == FdFlags::CLOEXEC);
        kassert!(!entry.mode.contains(OpenFlags::O_CLOEXEC));
    });

    test_case!(test_exclusive_open, {
        let ctx = context();
        let fs = MemFs::new();
        fs.add_file("/db", b"").unwrap();
        ctx.register_filesystem("mem", FsType::Ram, fs);
        let (p1, p2) = (Process::new(1, 0), Process::new(2, 0));

        let flags = OpenFlags::O_RDWR | OpenFlags::O_EXLOCK;
        ctx.open(&p1, "/db", flags).unwrap();
        kassert!(ctx.open(&p2, "/db", flags) == Err(FsError::WouldBlock));
        // 没有 O_EXLOCK 的打开不受影响
        kassert!(ctx.open(&p2, "/db", OpenFlags::O_RDONLY).is_ok());

        p1.exit(ctx.lock_table());
        kassert!(ctx.open(&p2, "/db", flags).is_ok());
    });

    test_case!(test_failed_reopen_keeps_held_lock, {
        let ctx = context();
        let fs = MemFs::new();
        fs.add_file("/db", b"").unwrap();
        ctx.register_filesystem("mem", FsType::Ram, fs);
        let (owner, other) = (Process::new(9, 0), Process::new(10, 0));

        let flags = OpenFlags::O_RDWR | OpenFlags::O_EXLOCK;
        ctx.open(&owner, "/db", flags).unwrap();
        while ctx.open(&owner, "/db", OpenFlags::O_RDONLY).is_ok() {}
        let id = ctx.lookup("/db").unwrap().id();

        kassert!(ctx.open(&owner, "/db", flags) == Err(FsError::TooManyOpenFiles));
        kassert!(ctx.lock_table().holder(id) == Some(9));
        kassert!(ctx.open(&other, "/db", flags) == Err(FsError::WouldBlock));
    });

    test_case!(test_exclusive_open_rolls_back_lock, {
        let ctx = context();
        let fs = MemFs::new();
        fs.add_file("/db", b"").unwrap();
        ctx.register_filesystem("mem", FsType::Ram, fs);
        let p = Process::new(1, 0);
        let small = Process::new(2, 0);
        // 占满 2 号进程的描述符表
        while ctx.open(&small, "/db", OpenFlags::O_RDONLY).is_ok() {}

        let flags = OpenFlags::O_RDWR | OpenFlags::O_EXLOCK;
        kassert!(ctx.open(&small, "/db", flags) == Err(FsError::TooManyOpenFiles));
        kassert!(ctx.open(&p, "/db", flags).is_ok());
    });
}
