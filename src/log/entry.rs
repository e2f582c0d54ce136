use super::config::MAX_LOG_MESSAGE_LENGTH;
use super::level::LogLevel;
use core::cmp::min;
use core::fmt::{self, Write};

#[derive(Debug, Clone)]
pub struct LogEntry {
    timestamp: usize,
    level: LogLevel,
    cpu_id: usize,
    task_id: u32,
    length: usize,
    message: [u8; MAX_LOG_MESSAGE_LENGTH],
}

impl LogEntry {
    pub fn new(
        level: LogLevel,
        cpu_id: usize,
        task_id: u32,
        timestamp: usize,
        message: &str,
    ) -> Self {
        Self::from_args(level, cpu_id, task_id, timestamp, format_args!("{}", message))
    }

    pub fn from_args(
        level: LogLevel,
        cpu_id: usize,
        task_id: u32,
        timestamp: usize,
        args: fmt::Arguments,
    ) -> Self {
        let mut entry = Self {
            timestamp,
            level,
            cpu_id,
            task_id,
            length: 0,
            message: [0; MAX_LOG_MESSAGE_LENGTH],
        };

        let mut writer = MessageWriter::new(&mut entry.message);
        let _ = fmt::write(&mut writer, args);
        entry.length = writer.len();

        entry
    }

    pub fn message(&self) -> &str {
        // 截断可能切在多字节字符中间，只保留合法前缀
        match core::str::from_utf8(&self.message[..self.length]) {
            Ok(s) => s,
            Err(e) => {
                let valid = e.valid_up_to();
                core::str::from_utf8(&self.message[..valid]).unwrap_or("")
            }
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn cpu_id(&self) -> usize {
        self.cpu_id
    }

    pub fn task_id(&self) -> u32 {
        self.task_id
    }

    pub fn timestamp(&self) -> usize {
        self.timestamp
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:12}] [{}] [CPU{}/T{:3}] {}",
            self.timestamp,
            self.level.as_str(),
            self.cpu_id,
            self.task_id,
            self.message()
        )
    }
}

/// a helper to write message from args to [u8; MAX_LOG_MESSAGE_LENGTH]
struct MessageWriter<'a> {
    buffer: &'a mut [u8],
    pos: usize,
}

impl<'a> MessageWriter<'a> {
    fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, pos: 0 }
    }

    fn len(&self) -> usize {
        self.pos
    }
}

impl Write for MessageWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self.buffer.get_mut(self.pos..).unwrap_or(&mut []);
        let to_copy = min(bytes.len(), remaining.len());

        remaining[..to_copy].copy_from_slice(&bytes[..to_copy]);
        self.pos += to_copy;
        Ok(())
    }
}
