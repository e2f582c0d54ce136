//! 路径处理
//!
//! 命名空间以规范化后的绝对路径为键，这里只做纯字符串层面的处理。

use crate::config::MAX_NAME_LEN;
use crate::vfs::FsError;
use alloc::string::String;
use alloc::vec::Vec;

/// 规范化绝对路径：合并重复的 `/`，消解 `.` 和 `..`（不越过根目录）
///
/// 相对路径按根目录解释，因为本子系统没有工作目录的概念。
pub fn normalize_path(path: &str) -> Result<String, FsError> {
    let mut stack: Vec<&str> = Vec::new();

    for part in path.split('/').filter(|s| !s.is_empty()) {
        match part {
            "." => {}
            ".." => {
                stack.pop();
            }
            name => {
                if name.len() > MAX_NAME_LEN {
                    return Err(FsError::NameTooLong);
                }
                stack.push(name);
            }
        }
    }

    let mut out = String::from("/");
    out.push_str(&stack.join("/"));
    Ok(out)
}

/// 拆分为 (父目录, 文件名)，文件名为空时返回 InvalidArgument
pub fn split_path(path: &str) -> Result<(String, String), FsError> {
    let normalized = normalize_path(path)?;
    let pos = normalized.rfind('/').unwrap_or(0);
    let filename = String::from(&normalized[pos + 1..]);
    if filename.is_empty() {
        return Err(FsError::InvalidArgument);
    }
    let dir = if pos == 0 {
        String::from("/")
    } else {
        String::from(&normalized[..pos])
    };
    Ok((dir, filename))
}

/// 路径最后一段，用作节点名
pub fn basename(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
}
