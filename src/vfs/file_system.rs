use crate::vfs::{DirEntry, DirStream, FsError, NodeOps, NodeType, OpenFlags, VfsNode};
use alloc::string::String;
use alloc::sync::Arc;

/// 文件系统类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsType {
    Ext2,
    Fat12,
    Ram,
    Other(u32),
}

/// 驱动为路径创建节点时返回的描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub name: String,
    pub node_type: NodeType,
    pub size: usize,
    pub inode: u32,
}

/// 具体文件系统驱动
///
/// 磁盘布局由驱动自己负责，这里只约定通用路径会调用的几个入口。
/// `inode` 是驱动在 [`NodeInfo`] 中交给节点的后端句柄。
pub trait FileSystemDriver: Send + Sync {
    fn read_file(&self, inode: u32, offset: usize, buf: &mut [u8]) -> Result<usize, FsError>;

    fn write_file(&self, inode: u32, offset: usize, buf: &[u8]) -> Result<usize, FsError>;

    /// 准备遍历目录，非目录返回 NotDirectory
    fn open_dir(&self, inode: u32) -> Result<(), FsError>;

    /// 目录中第 `index` 个目录项，越过末尾返回 `Ok(None)`
    fn read_dir(&self, inode: u32, index: usize) -> Result<Option<DirEntry>, FsError>;

    /// 为路径创建节点描述，路径不存在时返回 NotFound
    fn make_node(&self, path: &str) -> Result<NodeInfo, FsError>;
}

/// 当前激活的文件系统
#[derive(Clone)]
pub struct RegisteredFs {
    pub name: String,
    pub fs_type: FsType,
    pub driver: Arc<dyn FileSystemDriver>,
}

impl RegisteredFs {
    /// 让驱动解析路径，并把结果包装成分派到该驱动的节点
    pub fn make_node(&self, path: &str) -> Result<VfsNode, FsError> {
        let info = self.driver.make_node(path)?;
        let ops = Arc::new(FsNodeOps {
            driver: self.driver.clone(),
        });
        Ok(VfsNode::new(
            &info.name,
            info.node_type,
            info.size,
            info.inode,
            ops,
        ))
    }
}

/// 文件系统节点的操作表，全部转发给驱动
pub struct FsNodeOps {
    driver: Arc<dyn FileSystemDriver>,
}

impl NodeOps for FsNodeOps {
    fn read(
        &self,
        node: &VfsNode,
        offset: usize,
        buf: &mut [u8],
        _flags: OpenFlags,
    ) -> Result<usize, FsError> {
        if node.node_type() == NodeType::Directory {
            return Err(FsError::IsDirectory);
        }
        self.driver.read_file(node.inode(), offset, buf)
    }

    fn write(
        &self,
        node: &VfsNode,
        offset: usize,
        buf: &[u8],
        _flags: OpenFlags,
    ) -> Result<usize, FsError> {
        if node.node_type() == NodeType::Directory {
            return Err(FsError::IsDirectory);
        }
        let written = self.driver.write_file(node.inode(), offset, buf)?;
        node.grow_to(offset + written);
        Ok(written)
    }

    fn open_dir(&self, node: &VfsNode) -> Result<DirStream, FsError> {
        if node.node_type() != NodeType::Directory {
            return Err(FsError::NotDirectory);
        }
        self.driver.open_dir(node.inode())?;
        Ok(DirStream::new())
    }

    fn read_dir(&self, node: &VfsNode, stream: &mut DirStream) -> Result<Option<DirEntry>, FsError> {
        let entry = self.driver.read_dir(node.inode(), stream.position())?;
        if entry.is_some() {
            stream.advance();
        }
        Ok(entry)
    }
}
