//! 管道模块
//!
//! [`PipeRingBuffer`] 在 [`RingBuffer`] 外加一把锁和两条等待队列，提供阻塞读写；
//! [`Pipe`] 独占一个缓冲区并记录创建时登记的描述符号；
//! 管道通过 [`PipeOps`] 作为一个 VFS 节点暴露，读写两端共享同一个节点。
//!
//! 写满时的策略：能写多少写多少并返回实际字节数；一个字节都写不进去时，
//! 非阻塞写返回 WouldBlock，阻塞写挂起直到读者腾出空间。
//! 管道销毁后，读者得到 0（流结束），写者得到 BrokenPipe。
//! 最后一个写端描述符关闭后缓冲区被挂断：读完剩余数据后读者得到 0。

use crate::config::PIPE_BUFFER_SIZE;
use crate::kernel::{Scheduler, WaitQueue};
use crate::sync::SpinLock;
use crate::uapi::fcntl::FdFlags;
use crate::util::RingBuffer;
use crate::vfs::{
    FDTable, FsError, Namespace, NodeOps, NodeType, OpenFlags, VfsNode, basename,
};
use crate::pr_debug;
use alloc::sync::Arc;

struct PipeState {
    ring: RingBuffer,
    closed: bool,
    /// 以可写模式引用该管道的描述符数
    writers: usize,
    /// 写端曾经打开过，且现在全部关闭
    hung_up: bool,
}

/// 带阻塞语义的管道缓冲区
pub struct PipeRingBuffer {
    state: SpinLock<PipeState>,
    /// 等待数据的读者
    readers: WaitQueue,
    /// 等待空间的写者
    writers: WaitQueue,
    sched: Arc<dyn Scheduler>,
}

impl PipeRingBuffer {
    pub fn new(capacity: usize, sched: Arc<dyn Scheduler>) -> Self {
        Self {
            state: SpinLock::new(PipeState {
                ring: RingBuffer::new(capacity),
                closed: false,
                writers: 0,
                hung_up: false,
            }),
            readers: WaitQueue::new(),
            writers: WaitQueue::new(),
            sched,
        }
    }

    /// 读出至多 `buf.len()` 个字节
    ///
    /// 缓冲区为空时：非阻塞、已关闭或已挂断立即返回 0，否则挂起直到有数据、
    /// 被关闭或最后一个写端离开。
    pub fn read(&self, buf: &mut [u8], nonblocking: bool) -> Result<usize, FsError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut waited = None;
        loop {
            {
                let mut state = self.state.lock();
                if !state.ring.is_empty() {
                    let n = state.ring.read(buf);
                    drop(state);
                    if let Some(tid) = waited {
                        self.readers.remove_task(tid);
                    }
                    self.writers.wake_up_all(&*self.sched);
                    return Ok(n);
                }
                if state.closed || state.hung_up || nonblocking {
                    return Ok(0);
                }
                // 在锁内入队，放锁后写者的唤醒不会丢失
                let tid = self.sched.current_tid();
                self.readers.add_task(tid);
                waited = Some(tid);
            }
            self.sched.block_current();
        }
    }

    /// 写入尽可能多的字节，返回实际写入数
    pub fn write(&self, data: &[u8], nonblocking: bool) -> Result<usize, FsError> {
        if data.is_empty() {
            return Ok(0);
        }
        let mut waited = None;
        loop {
            {
                let mut state = self.state.lock();
                if state.closed {
                    return Err(FsError::BrokenPipe);
                }
                let n = state.ring.write(data);
                if n > 0 {
                    drop(state);
                    if let Some(tid) = waited {
                        self.writers.remove_task(tid);
                    }
                    // 唤醒所有在该缓冲区上等待的读者
                    self.readers.wake_up_all(&*self.sched);
                    return Ok(n);
                }
                if nonblocking {
                    return Err(FsError::WouldBlock);
                }
                let tid = self.sched.current_tid();
                self.writers.add_task(tid);
                waited = Some(tid);
            }
            self.sched.block_current();
        }
    }

    /// 移除从最旧字节起第 `location` 个字节
    pub fn remove(&self, location: usize) -> Result<u8, FsError> {
        let removed = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(FsError::BrokenPipe);
            }
            state.ring.remove(location).ok_or(FsError::InvalidArgument)?
        };
        self.writers.wake_up_all(&*self.sched);
        Ok(removed)
    }

    /// 多了一个写端；重新打开写端的 fifo 不再处于挂断状态
    pub fn attach_writer(&self) {
        let mut state = self.state.lock();
        state.writers += 1;
        state.hung_up = false;
    }

    /// 少了一个写端，最后一个写端离开时唤醒所有读者
    pub fn detach_writer(&self) {
        let last = {
            let mut state = self.state.lock();
            match state.writers {
                0 => false,
                n => {
                    state.writers = n - 1;
                    state.hung_up = n == 1;
                    state.hung_up
                }
            }
        };
        if last {
            self.readers.wake_up_all(&*self.sched);
        }
    }

    /// 所有写端都已关闭
    pub fn is_hung_up(&self) -> bool {
        self.state.lock().hung_up
    }

    /// 关闭缓冲区并归还存储，唤醒所有等待者；返回 false 表示之前已关闭
    pub fn close(&self) -> bool {
        {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            state.closed = true;
            state.ring.release();
        }
        self.readers.wake_up_all(&*self.sched);
        self.writers.wake_up_all(&*self.sched);
        true
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().ring.capacity()
    }

    /// 当前阻塞在读上的任务数
    pub fn waiting_readers(&self) -> usize {
        self.readers.len()
    }
}

/// 管道
pub struct Pipe {
    buffer: PipeRingBuffer,
    /// 创建时登记的 (读端, 写端) 描述符号，仅供查看
    fds: SpinLock<Option<(usize, usize)>>,
}

impl Pipe {
    /// 创建管道，`capacity` 为 0 时使用默认容量
    pub fn create(capacity: usize, sched: Arc<dyn Scheduler>) -> Arc<Pipe> {
        let capacity = if capacity == 0 {
            PIPE_BUFFER_SIZE
        } else {
            capacity
        };
        Arc::new(Pipe {
            buffer: PipeRingBuffer::new(capacity, sched),
            fds: SpinLock::new(None),
        })
    }

    /// 销毁管道：释放缓冲区并唤醒所有等待者，可重复调用
    pub fn destroy(&self) {
        if self.buffer.close() {
            pr_debug!("pipe {:?} destroyed", self.descriptors());
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.buffer.is_closed()
    }

    pub fn buffer(&self) -> &PipeRingBuffer {
        &self.buffer
    }

    pub fn read(&self, buf: &mut [u8], nonblocking: bool) -> Result<usize, FsError> {
        self.buffer.read(buf, nonblocking)
    }

    pub fn write(&self, data: &[u8], nonblocking: bool) -> Result<usize, FsError> {
        self.buffer.write(data, nonblocking)
    }

    pub fn remove(&self, location: usize) -> Result<u8, FsError> {
        self.buffer.remove(location)
    }

    pub fn descriptors(&self) -> Option<(usize, usize)> {
        *self.fds.lock()
    }

    fn set_descriptors(&self, read_fd: usize, write_fd: usize) {
        *self.fds.lock() = Some((read_fd, write_fd));
    }
}

/// 匿名管道随最后一个描述符关闭而销毁；fifo 没有 close 操作，节点常驻命名空间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeKind {
    Anonymous,
    Fifo,
}

/// 管道节点的操作表
pub struct PipeOps {
    pipe: Arc<Pipe>,
    kind: PipeKind,
}

impl PipeOps {
    pub fn new(pipe: Arc<Pipe>, kind: PipeKind) -> Self {
        Self { pipe, kind }
    }

    pub fn pipe(&self) -> &Arc<Pipe> {
        &self.pipe
    }
}

impl NodeOps for PipeOps {
    fn read(
        &self,
        _node: &VfsNode,
        _offset: usize,
        buf: &mut [u8],
        flags: OpenFlags,
    ) -> Result<usize, FsError> {
        self.pipe.read(buf, flags.contains(OpenFlags::O_NONBLOCK))
    }

    fn write(
        &self,
        _node: &VfsNode,
        _offset: usize,
        buf: &[u8],
        flags: OpenFlags,
    ) -> Result<usize, FsError> {
        self.pipe.write(buf, flags.contains(OpenFlags::O_NONBLOCK))
    }

    fn attach(&self, _node: &VfsNode, mode: OpenFlags) {
        if mode.writable() {
            self.pipe.buffer().attach_writer();
        }
    }

    fn detach(&self, _node: &VfsNode, mode: OpenFlags) {
        if mode.writable() {
            self.pipe.buffer().detach_writer();
        }
    }

    fn close(&self, _node: &VfsNode) -> Result<(), FsError> {
        match self.kind {
            PipeKind::Anonymous => {
                self.pipe.destroy();
                Ok(())
            }
            PipeKind::Fifo => Err(FsError::NotSupported),
        }
    }

    fn remove(&self, _node: &VfsNode, location: usize) -> Result<u8, FsError> {
        self.pipe.remove(location)
    }
}

/// 创建匿名管道并在 `table` 中登记读端和写端
///
/// `flags` 中的 O_CLOEXEC 和 O_NONBLOCK 同时作用于两端。
/// 写端登记失败时读端被回滚。
pub fn create_pipe(
    table: &FDTable,
    sched: Arc<dyn Scheduler>,
    flags: OpenFlags,
) -> Result<(usize, usize), FsError> {
    let pipe = Pipe::create(0, sched);
    let ops = Arc::new(PipeOps::new(pipe.clone(), PipeKind::Anonymous));
    let node = Arc::new(VfsNode::new(
        "pipe",
        NodeType::Pipe,
        pipe.buffer().capacity(),
        0,
        ops,
    ));

    let fd_flags = FdFlags::from_open_flags(flags);
    let status = flags & OpenFlags::O_NONBLOCK;

    let read_fd = match table.register(node.clone(), fd_flags, OpenFlags::O_RDONLY | status) {
        Ok(fd) => fd,
        Err(e) => {
            pipe.destroy();
            return Err(e);
        }
    };
    let write_fd = match table.register(node, fd_flags, OpenFlags::O_WRONLY | status) {
        Ok(fd) => fd,
        Err(e) => {
            // 读端是唯一的引用，关闭它会销毁管道
            table.close(read_fd);
            return Err(e);
        }
    };

    pipe.set_descriptors(read_fd, write_fd);
    pr_debug!(
        "pipe created for pid {}: read fd {}, write fd {}",
        table.owner(),
        read_fd,
        write_fd
    );
    Ok((read_fd, write_fd))
}

/// 创建命名管道并永久挂入命名空间
pub fn make_fifo(
    namespace: &Namespace,
    sched: Arc<dyn Scheduler>,
    path: &str,
) -> Result<Arc<VfsNode>, FsError> {
    let pipe = Pipe::create(0, sched);
    let ops = Arc::new(PipeOps::new(pipe.clone(), PipeKind::Fifo));
    link_fifo(namespace, path, pipe, ops)
}

/// 用给定的操作表把 fifo 节点挂到 `path`，供需要定制写入行为的设备使用
pub(crate) fn link_fifo(
    namespace: &Namespace,
    path: &str,
    pipe: Arc<Pipe>,
    ops: Arc<dyn NodeOps>,
) -> Result<Arc<VfsNode>, FsError> {
    let node = Arc::new(VfsNode::new(
        basename(path),
        NodeType::Pipe,
        pipe.buffer().capacity(),
        0,
        ops,
    ));
    if let Err(e) = namespace.link(path, node.clone()) {
        pipe.destroy();
        return Err(e);
    }
    pr_debug!("fifo linked at {}", path);
    Ok(node)
}
