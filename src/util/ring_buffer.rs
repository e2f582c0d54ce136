//! 环形缓冲区模块
//!
//! 固定容量的字节 FIFO。`head` 是写入位置，`tail` 是读取位置；
//! 两者相等时由 `status` 区分空和满，已缓冲字节数由两个游标对容量取模得到，
//! 始终落在 `[0, capacity]` 内。
//!
//! 这里只负责存储，阻塞与唤醒由上层的 [`PipeRingBuffer`](crate::ipc::PipeRingBuffer) 处理。

use alloc::vec;
use alloc::vec::Vec;

/// 缓冲区状态枚举
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum BufferStatus {
    Full,
    Empty,
    Normal,
}

/// 环形缓冲区结构体
#[derive(Debug)]
pub struct RingBuffer {
    arr: Vec<u8>,
    head: usize,
    tail: usize,
    status: BufferStatus,
}

impl RingBuffer {
    /// 创建容量为 `capacity` 的缓冲区
    pub fn new(capacity: usize) -> Self {
        RingBuffer {
            arr: vec![0; capacity],
            head: 0,
            tail: 0,
            status: BufferStatus::Empty,
        }
    }

    pub fn capacity(&self) -> usize {
        self.arr.len()
    }

    /// 已缓冲的字节数
    pub fn len(&self) -> usize {
        match self.status {
            BufferStatus::Full => self.capacity(),
            BufferStatus::Empty => 0,
            BufferStatus::Normal => {
                (self.head + self.capacity() - self.tail) % self.capacity()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status == BufferStatus::Empty
    }

    pub fn is_full(&self) -> bool {
        self.status == BufferStatus::Full || self.capacity() == 0
    }

    /// 获取环形缓冲区的可用空间
    pub fn available_space(&self) -> usize {
        self.capacity() - self.len()
    }

    /// 从环形缓冲区读取一个字节
    pub fn read_byte(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.arr[self.tail];
        self.tail = (self.tail + 1) % self.capacity();
        self.status = if self.tail == self.head {
            BufferStatus::Empty
        } else {
            BufferStatus::Normal
        };
        Some(byte)
    }

    /// 向环形缓冲区写入一个字节，满时返回 false
    pub fn write_byte(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.arr[self.head] = byte;
        self.head = (self.head + 1) % self.capacity();
        self.status = if self.head == self.tail {
            BufferStatus::Full
        } else {
            BufferStatus::Normal
        };
        true
    }

    /// 写入尽可能多的字节，返回实际写入数
    pub fn write(&mut self, data: &[u8]) -> usize {
        let count = data.len().min(self.available_space());
        for &byte in &data[..count] {
            self.write_byte(byte);
        }
        count
    }

    /// 读出至多 `buf.len()` 个字节，返回实际读出数
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let count = buf.len().min(self.len());
        for slot in &mut buf[..count] {
            // count <= len，read_byte 不会返回 None
            *slot = self.read_byte().unwrap_or(0);
        }
        count
    }

    /// 移除从最旧字节起第 `location` 个字节，其后的字节依次前移
    pub fn remove(&mut self, location: usize) -> Option<u8> {
        let len = self.len();
        if location >= len {
            return None;
        }
        let cap = self.capacity();
        let tail = self.tail;
        let at = |i: usize| (tail + i) % cap;
        let removed = self.arr[at(location)];
        for i in location..len - 1 {
            self.arr[at(i)] = self.arr[at(i + 1)];
        }
        self.head = (self.head + cap - 1) % cap;
        self.status = if len == 1 {
            BufferStatus::Empty
        } else {
            BufferStatus::Normal
        };
        Some(removed)
    }

    /// 丢弃所有数据并归还存储，之后容量为 0
    pub fn release(&mut self) {
        self.arr = Vec::new();
        self.head = 0;
        self.tail = 0;
        self.status = BufferStatus::Empty;
    }
}
