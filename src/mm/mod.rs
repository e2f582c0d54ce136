//! 内存管理协作者接口
//!
//! 页表和物理页分配由内存管理器负责，映像装载器只通过 [`AddressSpace`]
//! 申请映射并写入数据。

/// 映射失败的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// 没有足够的物理内存
    OutOfMemory,
    /// 地址范围非法（越过用户空间上界、起止颠倒等）
    InvalidRange,
    /// 写入未映射的地址
    Unmapped,
}

/// 进程地址空间
pub trait AddressSpace {
    /// 映射 `[start, end)`，`phys_hint` 为 0 表示由内存管理器挑选物理页。
    /// 重复映射已映射的区间必须成功。
    fn map(
        &mut self,
        start: usize,
        end: usize,
        phys_hint: usize,
        writable: bool,
    ) -> Result<(), MapError>;

    /// 把 `data` 写到已映射的虚拟地址 `vaddr`
    fn write_bytes_at(&mut self, vaddr: usize, data: &[u8]) -> Result<(), MapError>;

    /// 把 `[vaddr, vaddr + len)` 清零
    fn fill_zero(&mut self, vaddr: usize, len: usize) -> Result<(), MapError> {
        const CHUNK: usize = 256;
        let zeros = [0u8; CHUNK];
        let mut done = 0;
        while done < len {
            let n = (len - done).min(CHUNK);
            self.write_bytes_at(vaddr + done, &zeros[..n])?;
            done += n;
        }
        Ok(())
    }
}
