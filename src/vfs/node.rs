//! VFS 节点与操作分派
//!
//! 节点由类型标签和一张操作表组成。操作表是 [`NodeOps`] trait 对象，
//! 每个操作都有返回 [`FsError::NotSupported`] 的默认实现，
//! 后端只覆盖自己支持的操作，调用者把"不支持"当作普通的错误结果处理。
//!
//! 节点以 `Arc<VfsNode>` 共享：命名空间、文件描述符表和管道都只持有引用，
//! 不拥有节点的生命周期。节点另外维护一个打开计数，最后一个描述符
//! 关闭时由描述符表调用 [`VfsNode::close`]。

use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::vfs::{FsError, OpenFlags};

/// 节点类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    File,
    Directory,
    CharDevice,
    BlockDevice,
    Pipe,
    Symlink,
}

/// 节点的非拥有标识，用于锁表和描述符比较
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

static NEXT_NODE_ID: AtomicUsize = AtomicUsize::new(1);

impl NodeId {
    fn alloc() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// 目录项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inode_no: u32,
    pub node_type: NodeType,
}

/// 打开的目录流
///
/// 目录节点被打开时创建，存放在描述符的游标位置。
/// `position` 是后端的遍历下标；`pending` 暂存上一次因缓冲区不足而没能
/// 交给调用者的目录项；`emitted` 是流中已经输出的记录字节总数。
#[derive(Debug, Default)]
pub struct DirStream {
    position: usize,
    pub(crate) pending: Option<DirEntry>,
    pub(crate) emitted: usize,
}

impl DirStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn advance(&mut self) {
        self.position += 1;
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

/// 节点操作表
///
/// 所有方法都是可选的，默认返回 [`FsError::NotSupported`]。
pub trait NodeOps: Send + Sync {
    /// 从 `offset` 处读取到 `buf`，`flags` 为描述符的打开模式
    fn read(
        &self,
        _node: &VfsNode,
        _offset: usize,
        _buf: &mut [u8],
        _flags: OpenFlags,
    ) -> Result<usize, FsError> {
        Err(FsError::NotSupported)
    }

    fn write(
        &self,
        _node: &VfsNode,
        _offset: usize,
        _buf: &[u8],
        _flags: OpenFlags,
    ) -> Result<usize, FsError> {
        Err(FsError::NotSupported)
    }

    /// 最后一个引用该节点的描述符关闭时调用
    fn close(&self, _node: &VfsNode) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 描述符表中装入了一个以 `mode` 打开该节点的表项
    fn attach(&self, _node: &VfsNode, _mode: OpenFlags) {}

    /// 以 `mode` 打开该节点的表项被清空，在 [`NodeOps::close`] 之前调用
    fn detach(&self, _node: &VfsNode, _mode: OpenFlags) {}

    fn open_dir(&self, _node: &VfsNode) -> Result<DirStream, FsError> {
        Err(FsError::NotSupported)
    }

    /// 读取下一个目录项，`Ok(None)` 表示目录已读完
    fn read_dir(
        &self,
        _node: &VfsNode,
        _stream: &mut DirStream,
    ) -> Result<Option<DirEntry>, FsError> {
        Err(FsError::NotSupported)
    }

    /// 移除并返回缓冲区中指定位置的单个字节
    fn remove(&self, _node: &VfsNode, _location: usize) -> Result<u8, FsError> {
        Err(FsError::NotSupported)
    }
}

/// VFS 节点
pub struct VfsNode {
    id: NodeId,
    name: String,
    node_type: NodeType,
    size: AtomicUsize,
    /// 后端句柄，由创建节点的驱动解释
    inode: u32,
    ops: Arc<dyn NodeOps>,
    open_count: AtomicUsize,
}

impl VfsNode {
    pub fn new(
        name: &str,
        node_type: NodeType,
        size: usize,
        inode: u32,
        ops: Arc<dyn NodeOps>,
    ) -> Self {
        Self {
            id: NodeId::alloc(),
            name: String::from(name),
            node_type,
            size: AtomicUsize::new(size),
            inode,
            ops,
            open_count: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    pub fn set_size(&self, size: usize) {
        self.size.store(size, Ordering::Release);
    }

    /// 写入后扩展节点大小，不会缩小
    pub fn grow_to(&self, size: usize) {
        self.size.fetch_max(size, Ordering::AcqRel);
    }

    pub fn inode(&self) -> u32 {
        self.inode
    }

    pub fn ops(&self) -> &Arc<dyn NodeOps> {
        &self.ops
    }

    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::Acquire)
    }

    /// 有新的描述符引用该节点
    pub(crate) fn acquire(&self) {
        self.open_count.fetch_add(1, Ordering::AcqRel);
    }

    /// 一个描述符不再引用该节点，返回 true 表示这是最后一个
    pub(crate) fn release(&self) -> bool {
        let prev = self
            .open_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        matches!(prev, Ok(1))
    }

    pub fn read(&self, offset: usize, buf: &mut [u8], flags: OpenFlags) -> Result<usize, FsError> {
        self.ops.read(self, offset, buf, flags)
    }

    pub fn write(&self, offset: usize, buf: &[u8], flags: OpenFlags) -> Result<usize, FsError> {
        self.ops.write(self, offset, buf, flags)
    }

    pub fn close(&self) -> Result<(), FsError> {
        self.ops.close(self)
    }

    pub(crate) fn attach(&self, mode: OpenFlags) {
        self.acquire();
        self.ops.attach(self, mode);
    }

    /// 与 [`VfsNode::release`] 相同，先通知操作表
    pub(crate) fn detach(&self, mode: OpenFlags) -> bool {
        self.ops.detach(self, mode);
        self.release()
    }

    pub fn open_dir(&self) -> Result<DirStream, FsError> {
        self.ops.open_dir(self)
    }

    pub fn read_dir(&self, stream: &mut DirStream) -> Result<Option<DirEntry>, FsError> {
        self.ops.read_dir(self, stream)
    }

    pub fn remove(&self, location: usize) -> Result<u8, FsError> {
        self.ops.remove(self, location)
    }
}

impl fmt::Debug for VfsNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VfsNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type", &self.node_type)
            .field("size", &self.size())
            .field("open_count", &self.open_count())
            .finish()
    }
}
