//! 有界日志缓冲区
//!
//! 容量固定为 [`LOG_BUFFER_ENTRIES`]，写满后丢弃最旧的条目并累计丢弃计数。

use alloc::collections::VecDeque;
use core::sync::atomic::{AtomicUsize, Ordering};

use super::config::LOG_BUFFER_ENTRIES;
use super::entry::LogEntry;
use crate::sync::SpinLock;

pub struct LogBuffer {
    entries: SpinLock<VecDeque<LogEntry>>,
    dropped: AtomicUsize,
}

impl LogBuffer {
    pub const fn new() -> Self {
        Self {
            entries: SpinLock::new(VecDeque::new()),
            dropped: AtomicUsize::new(0),
        }
    }

    /// 追加一条日志，缓冲区已满时挤掉最旧的一条
    pub fn write(&self, entry: &LogEntry) {
        let mut entries = self.entries.lock();
        if entries.len() >= LOG_BUFFER_ENTRIES {
            entries.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        entries.push_back(entry.clone());
    }

    pub fn read(&self) -> Option<LogEntry> {
        self.entries.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}
