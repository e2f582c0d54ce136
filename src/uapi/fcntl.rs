//! fcntl 相关的用户空间 API 定义

use bitflags::bitflags;

use crate::vfs::OpenFlags;

/// fcntl 命令，只收录本子系统支持的部分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum FcntlCmd {
    /// 复制文件描述符，新 fd >= arg (F_DUPFD)
    DupFd = 0,
    /// 获取文件描述符标志 (F_GETFD)
    GetFd = 1,
    /// 设置文件描述符标志 (F_SETFD)
    SetFd = 2,
    /// 获取文件状态标志 (F_GETFL)
    GetFl = 3,
    /// 设置文件状态标志 (F_SETFL)
    SetFl = 4,
}

impl FcntlCmd {
    pub fn from_raw(cmd: i32) -> Option<Self> {
        match cmd {
            0 => Some(Self::DupFd),
            1 => Some(Self::GetFd),
            2 => Some(Self::SetFd),
            3 => Some(Self::GetFl),
            4 => Some(Self::SetFl),
            _ => None,
        }
    }
}

bitflags! {
    /// 文件描述符标志（每个 fd 独立，dup 出来的 fd 不继承）
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FdFlags: u32 {
        /// exec 时关闭 (FD_CLOEXEC)
        const CLOEXEC = 1;
    }
}

impl FdFlags {
    /// 从 open 标志中提取 fd 标志
    pub fn from_open_flags(flags: OpenFlags) -> Self {
        if flags.contains(OpenFlags::O_CLOEXEC) {
            FdFlags::CLOEXEC
        } else {
            FdFlags::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    test_case!(test_fdflags_from_open_flags, {
        let flags = OpenFlags::O_RDONLY | OpenFlags::O_CLOEXEC;
        kassert!(FdFlags::from_open_flags(flags) == FdFlags::CLOEXEC);
        kassert!(FdFlags::from_open_flags(OpenFlags::O_WRONLY).is_empty());
    });

    test_case!(test_fcntl_cmd_from_raw, {
        kassert!(FcntlCmd::from_raw(2) == Some(FcntlCmd::SetFd));
        kassert!(FcntlCmd::from_raw(1030).is_none());
    });
}
