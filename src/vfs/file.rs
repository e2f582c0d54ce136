//! 打开模式与状态标志

bitflags::bitflags! {
    /// 文件打开标志（与 POSIX 兼容）
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OpenFlags: u32 {
        const O_RDONLY    = 0o0;        // 只读
        const O_WRONLY    = 0o1;        // 只写
        const O_RDWR      = 0o2;        // 读写
        const O_ACCMODE   = 0o3;        // 访问模式掩码
        const O_CREAT     = 0o100;      // 不存在则创建
        const O_EXCL      = 0o200;      // 与 O_CREAT 配合，必须不存在
        const O_TRUNC     = 0o1000;     // 截断到 0
        const O_APPEND    = 0o2000;     // 追加模式
        const O_NONBLOCK  = 0o4000;     // 非阻塞 I/O
        const O_DIRECTORY = 0o200000;   // 必须是目录
        const O_CLOEXEC   = 0o2000000;  // exec 时关闭
        const O_EXLOCK    = 0x1000_0000; // 打开时在全局锁表中独占节点
    }
}

impl OpenFlags {
    /// 检查是否可读（O_RDONLY 或 O_RDWR）
    pub fn readable(&self) -> bool {
        let mode = self.bits() & OpenFlags::O_ACCMODE.bits();
        mode == OpenFlags::O_RDONLY.bits() || mode == OpenFlags::O_RDWR.bits()
    }

    /// 检查是否可写（O_WRONLY 或 O_RDWR）
    pub fn writable(&self) -> bool {
        let mode = self.bits() & OpenFlags::O_ACCMODE.bits();
        mode == OpenFlags::O_WRONLY.bits() || mode == OpenFlags::O_RDWR.bits()
    }

    /// F_SETFL 能修改的状态位
    pub fn status_mask() -> Self {
        OpenFlags::O_APPEND | OpenFlags::O_NONBLOCK
    }
}
