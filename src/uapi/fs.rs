//! 目录项记录布局（i386）
//!
//! ```text
//! +0  d_ino    u32
//! +4  d_off    i32   流内累计字节数，指向下一条记录
//! +8  d_reclen u16   本条记录总长
//! +10 d_type   u8
//! +11 d_name   以 \0 结尾，整体按 4 字节对齐
//! ```

use crate::vfs::{DirEntry, NodeType};

/// d_type 取值
pub const DT_FIFO: u8 = 1;
pub const DT_CHR: u8 = 2;
pub const DT_DIR: u8 = 4;
pub const DT_BLK: u8 = 6;
pub const DT_REG: u8 = 8;
pub const DT_LNK: u8 = 10;

pub struct Dirent;

impl Dirent {
    /// 不含文件名的固定头部长度
    pub const BASE_SIZE: usize = 11;

    /// 计算包含文件名的总长度（4 字节对齐）
    pub fn total_len(name: &str) -> usize {
        let len = Self::BASE_SIZE + name.len() + 1;
        (len + 3) & !3
    }

    /// 把一条目录项写入 `buf` 开头，返回写入长度
    ///
    /// 调用者保证 `buf.len() >= total_len(entry.name)`。
    pub fn encode(entry: &DirEntry, d_off: i32, buf: &mut [u8]) -> usize {
        let reclen = Self::total_len(&entry.name);
        let record = &mut buf[..reclen];
        record.fill(0);
        record[0..4].copy_from_slice(&entry.inode_no.to_le_bytes());
        record[4..8].copy_from_slice(&d_off.to_le_bytes());
        record[8..10].copy_from_slice(&(reclen as u16).to_le_bytes());
        record[10] = d_type_of(entry.node_type);
        record[Self::BASE_SIZE..Self::BASE_SIZE + entry.name.len()]
            .copy_from_slice(entry.name.as_bytes());
        reclen
    }
}

pub fn d_type_of(node_type: NodeType) -> u8 {
    match node_type {
        NodeType::File => DT_REG,
        NodeType::Directory => DT_DIR,
        NodeType::CharDevice => DT_CHR,
        NodeType::BlockDevice => DT_BLK,
        NodeType::Pipe => DT_FIFO,
        NodeType::Symlink => DT_LNK,
    }
}
