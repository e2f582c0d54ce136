//! 虚拟文件系统
//!
//! - [`VfsNode`]：类型标签加一张 [`NodeOps`] 操作表，读写、目录遍历都经由操作表分派
//! - [`FDTable`]：每个进程一张，把小整数映射到节点引用和打开状态
//! - [`Namespace`]：路径到节点的映射，fifo 和标准流设备挂在这里
//! - [`FileLockTable`]：独占打开用的全局锁表
//! - [`RegisteredFs`]：当前激活的具体文件系统驱动
pub mod dirent;
pub mod error;
pub mod fd_table;
pub mod file;
pub mod file_lock;
pub mod file_system;
pub mod namespace;
pub mod node;
pub mod path;
pub mod stdio;

pub use dirent::read_directory_entries;
pub use error::FsError;
pub use fd_table::{FDTable, FdCursor, FdEntry};
pub use file::OpenFlags;
pub use file_lock::FileLockTable;
pub use file_system::{FileSystemDriver, FsNodeOps, FsType, NodeInfo, RegisteredFs};
pub use namespace::Namespace;
pub use node::{DirEntry, DirStream, NodeId, NodeOps, NodeType, VfsNode};
pub use path::{basename, normalize_path, split_path};
pub use stdio::{StderrOps, StdinOps, StdoutOps, init_char_specials, open_std_streams};

#[cfg(test)]
mod tests;
