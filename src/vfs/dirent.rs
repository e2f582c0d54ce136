//! 目录项枚举（getdents）

use crate::uapi::fs::Dirent;
use crate::vfs::{FDTable, FsError};

/// 从目录描述符读取连续的目录项记录到 `buf`
///
/// 每条记录的 `d_off` 是流内到该记录末尾为止的累计字节数，重复调用从上次停下
/// 的位置继续。放不下的记录留到下一次调用；连第一条都放不下时返回 InvalidArgument。
/// 描述符上没有目录流时返回 BadFileDescriptor，目录读完后返回 0。
pub fn read_directory_entries(table: &FDTable, fd: usize, buf: &mut [u8]) -> Result<usize, FsError> {
    let entry = table.get(fd)?;
    let stream = entry
        .dir_stream()
        .ok_or(FsError::BadFileDescriptor)?
        .clone();
    let mut stream = stream.lock();

    let mut written = 0;
    loop {
        let next = match stream.pending.take() {
            Some(pending) => pending,
            None => match entry.node.read_dir(&mut stream) {
                Ok(Some(e)) => e,
                Ok(None) => break,
                // 已经写出的记录照常返回，错误留给下一次调用
                Err(e) if written == 0 => return Err(e),
                Err(_) => break,
            },
        };

        let reclen = Dirent::total_len(&next.name);
        if written + reclen > buf.len() {
            stream.pending = Some(next);
            if written == 0 {
                return Err(FsError::InvalidArgument);
            }
            break;
        }

        stream.emitted += reclen;
        let d_off = stream.emitted as i32;
        written += Dirent::encode(&next, d_off, &mut buf[written..]);
    }
    Ok(written)
}
