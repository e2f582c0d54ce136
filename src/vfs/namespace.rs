//! 节点命名空间
//!
//! 把规范化路径映射到节点。设备节点、fifo 等不属于具体文件系统的节点
//! 通过 [`Namespace::link`] 永久挂入，描述符关闭不会把它们移除。

use crate::vfs::{FsError, VfsNode, normalize_path};
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use hashbrown::HashMap;
use spin::RwLock;

pub struct Namespace {
    nodes: RwLock<HashMap<String, Arc<VfsNode>>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// 挂入节点，路径已被占用时返回 AlreadyExists
    pub fn link(&self, path: &str, node: Arc<VfsNode>) -> Result<(), FsError> {
        let key = normalize_path(path)?;
        let mut nodes = self.nodes.write();
        if nodes.contains_key(&key) {
            return Err(FsError::AlreadyExists);
        }
        nodes.insert(key, node);
        Ok(())
    }

    pub fn lookup(&self, path: &str) -> Result<Arc<VfsNode>, FsError> {
        let key = normalize_path(path)?;
        self.nodes.read().get(&key).cloned().ok_or(FsError::NotFound)
    }

    pub fn unlink(&self, path: &str) -> Result<Arc<VfsNode>, FsError> {
        let key = normalize_path(path)?;
        self.nodes.write().remove(&key).ok_or(FsError::NotFound)
    }

    /// 已挂入的路径，按字典序
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.nodes.read().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}
