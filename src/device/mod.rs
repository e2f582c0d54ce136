//! 设备协作者接口
//!
//! TTY 与串口驱动不属于本子系统，标准流节点通过这两个 trait 输出。

/// TTY 前景色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtyColor {
    White,
    Red,
}

/// 终端驱动
pub trait Terminal: Send + Sync {
    /// 向编号为 `tty` 的终端写入，返回写入的字节数
    fn write(&self, tty: usize, data: &[u8]) -> usize;

    fn set_color(&self, tty: usize, color: TtyColor);
}

/// 串口，作为诊断输出通道
pub trait SerialPort: Send + Sync {
    fn put(&self, byte: u8);
}
