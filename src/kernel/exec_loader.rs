//! 可执行映像装载
//!
//! 只支持静态链接的 i386 EXEC 映像。装载分两遍：第一遍解析并校验文件头、
//! 程序头表和节头表，所有偏移都对照映像长度做越界检查；全部通过后第二遍才向
//! 地址空间申请映射并拷贝数据，因此被拒绝的映像不会留下任何映射。

use alloc::vec::Vec;

use crate::kernel::Process;
use crate::mm::{AddressSpace, MapError};
use crate::uapi::errno::{EFAULT, ENOEXEC, ENOMEM};
use crate::{pr_debug, pr_warn};

const ELF_MAGIC: &[u8; 4] = b"\x7fELF";
const ELFCLASS32: u8 = 1;
const ELFDATA2LSB: u8 = 1;
const EV_CURRENT: u8 = 1;

const ET_EXEC: u16 = 2;
const EM_386: u16 = 3;

const EHDR_SIZE: usize = 52;
const PHDR_SIZE: usize = 32;
const SHDR_SIZE: usize = 40;

const PT_NULL: u32 = 0;
const PT_LOAD: u32 = 1;

const PF_X: u32 = 1;
const PF_W: u32 = 2;

/// 映像被拒绝的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfRejection {
    BadMagic,
    /// 不是 32 位映像
    BadClass,
    /// 不是小端
    BadEncoding,
    /// 不是 x86
    BadMachine,
    /// 头部版本低于支持的最低版本
    BadVersion,
    /// 重定位文件、共享对象等非 EXEC 类型
    NotExecType,
    /// 某个表或段越过了映像末尾
    Truncated,
    /// 段的文件大小超过内存大小，或地址范围溢出
    SegmentTooLarge,
    NoLoadableSegment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    NotExecutable(ElfRejection),
    Map(MapError),
}

impl ExecError {
    pub fn errno(&self) -> i32 {
        match self {
            ExecError::NotExecutable(_) => ENOEXEC,
            ExecError::Map(MapError::OutOfMemory) => ENOMEM,
            ExecError::Map(_) => EFAULT,
        }
    }

    pub fn to_errno(&self) -> isize {
        -(self.errno() as isize)
    }
}

impl From<ElfRejection> for ExecError {
    fn from(reason: ElfRejection) -> Self {
        ExecError::NotExecutable(reason)
    }
}

impl From<MapError> for ExecError {
    fn from(e: MapError) -> Self {
        ExecError::Map(e)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ElfHeader {
    pub e_type: u16,
    pub e_machine: u16,
    pub e_entry: u32,
    pub e_phoff: u32,
    pub e_shoff: u32,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
}

#[derive(Clone, Copy, Debug)]
pub struct Segment {
    pub p_type: u32,
    pub p_offset: u32,
    pub p_vaddr: u32,
    pub p_filesz: u32,
    pub p_memsz: u32,
    pub p_flags: u32,
}

impl Segment {
    fn start(&self) -> usize {
        self.p_vaddr as usize
    }

    fn end(&self) -> usize {
        self.p_vaddr as usize + self.p_memsz as usize
    }

    fn writable(&self) -> bool {
        self.p_flags & PF_W != 0
    }

    fn file_bytes<'a>(&self, image: &'a [u8]) -> &'a [u8] {
        let off = self.p_offset as usize;
        &image[off..off + self.p_filesz as usize]
    }
}

fn le_u16(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}
fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

/// 取 `image[off..off + len]`，越界返回 Truncated
fn slice_at(image: &[u8], off: usize, len: usize) -> Result<&[u8], ElfRejection> {
    let end = off.checked_add(len).ok_or(ElfRejection::Truncated)?;
    image.get(off..end).ok_or(ElfRejection::Truncated)
}

/// 解析并校验文件头，依次检查魔数、位宽、字节序、架构、版本和类型
pub fn parse_header(image: &[u8]) -> Result<ElfHeader, ElfRejection> {
    if image.len() < 4 || &image[0..4] != ELF_MAGIC {
        return Err(ElfRejection::BadMagic);
    }
    let hdr = slice_at(image, 0, EHDR_SIZE)?;
    if hdr[4] != ELFCLASS32 {
        return Err(ElfRejection::BadClass);
    }
    if hdr[5] != ELFDATA2LSB {
        return Err(ElfRejection::BadEncoding);
    }

    let e_machine = le_u16(&hdr[18..20]);
    if e_machine != EM_386 {
        return Err(ElfRejection::BadMachine);
    }
    if hdr[6] < EV_CURRENT {
        return Err(ElfRejection::BadVersion);
    }
    let e_type = le_u16(&hdr[16..18]);
    if e_type != ET_EXEC {
        return Err(ElfRejection::NotExecType);
    }

    Ok(ElfHeader {
        e_type,
        e_machine,
        e_entry: le_u32(&hdr[24..28]),
        e_phoff: le_u32(&hdr[28..32]),
        e_shoff: le_u32(&hdr[32..36]),
        e_phentsize: le_u16(&hdr[42..44]),
        e_phnum: le_u16(&hdr[44..46]),
        e_shentsize: le_u16(&hdr[46..48]),
        e_shnum: le_u16(&hdr[48..50]),
    })
}

fn parse_program_headers(image: &[u8], eh: &ElfHeader) -> Result<Vec<Segment>, ElfRejection> {
    let phnum = eh.e_phnum as usize;
    let entsz = eh.e_phentsize as usize;
    if phnum > 0 && entsz < PHDR_SIZE {
        return Err(ElfRejection::Truncated);
    }
    let table = slice_at(image, eh.e_phoff as usize, phnum * entsz)?;

    let mut out = Vec::with_capacity(phnum);
    for e in table.chunks_exact(entsz.max(1)).take(phnum) {
        out.push(Segment {
            p_type: le_u32(&e[0..4]),
            p_offset: le_u32(&e[4..8]),
            p_vaddr: le_u32(&e[8..12]),
            p_filesz: le_u32(&e[16..20]),
            p_memsz: le_u32(&e[20..24]),
            p_flags: le_u32(&e[24..28]),
        });
    }
    Ok(out)
}

/// 遍历节头表，只做越界检查
///
/// 节信息目前不参与装载，返回节的数量。
fn walk_section_headers(image: &[u8], eh: &ElfHeader) -> Result<usize, ElfRejection> {
    let shnum = eh.e_shnum as usize;
    if shnum == 0 {
        return Ok(0);
    }
    let entsz = eh.e_shentsize as usize;
    if entsz < SHDR_SIZE {
        return Err(ElfRejection::Truncated);
    }
    let table = slice_at(image, eh.e_shoff as usize, shnum * entsz)?;
    Ok(table.chunks_exact(entsz).count())
}

/// 校验所有段，返回 LOAD 段的最高结束地址
fn check_segments(image: &[u8], segments: &[Segment]) -> Result<usize, ElfRejection> {
    let mut program_break = None;
    for seg in segments {
        if seg.p_type == PT_NULL {
            continue;
        }
        if seg.p_filesz > seg.p_memsz {
            return Err(ElfRejection::SegmentTooLarge);
        }
        if seg.p_type != PT_LOAD {
            continue;
        }
        slice_at(image, seg.p_offset as usize, seg.p_filesz as usize)?;
        if seg.p_vaddr.checked_add(seg.p_memsz).is_none() {
            return Err(ElfRejection::SegmentTooLarge);
        }
        program_break = Some(program_break.map_or(seg.end(), |b: usize| b.max(seg.end())));
    }
    program_break.ok_or(ElfRejection::NoLoadableSegment)
}

/// 把映像装入 `space`，设置进程的初始堆上界，返回入口地址
pub fn load_image(
    image: &[u8],
    space: &mut dyn AddressSpace,
    process: &Process,
) -> Result<usize, ExecError> {
    let validated = parse_header(image).and_then(|eh| {
        let segments = parse_program_headers(image, &eh)?;
        walk_section_headers(image, &eh)?;
        let program_break = check_segments(image, &segments)?;
        Ok((eh, segments, program_break))
    });
    let (eh, segments, program_break) = match validated {
        Ok(v) => v,
        Err(reason) => {
            pr_warn!("pid {}: image rejected: {:?}", process.pid(), reason);
            return Err(reason.into());
        }
    };

    for seg in segments.iter().filter(|s| s.p_type == PT_LOAD) {
        pr_debug!(
            "map segment [{:#x}, {:#x}) filesz={:#x} writable={}",
            seg.start(),
            seg.end(),
            seg.p_filesz,
            seg.writable()
        );
        if seg.p_flags & PF_X != 0 {
            // 执行权限没有传给内存管理器
            pr_debug!("segment at {:#x} is executable; mapping without X", seg.start());
        }
        space.map(seg.start(), seg.end(), 0, seg.writable())?;

        let data = seg.file_bytes(image);
        space.write_bytes_at(seg.start(), data)?;
        let tail = (seg.p_memsz - seg.p_filesz) as usize;
        if tail > 0 {
            space.fill_zero(seg.start() + data.len(), tail)?;
        }
    }

    process.set_program_break(program_break);
    Ok(eh.e_entry as usize)
}

/// 替换进程映像：装载成功后执行 close-on-exec 清理
pub fn execute(
    process: &Process,
    image: &[u8],
    space: &mut dyn AddressSpace,
) -> Result<usize, ExecError> {
    let entry = load_image(image, space, process)?;
    process.fd_table().close_exec();
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::doubles::{ElfBuilder, RecordingSpace};
    use crate::uapi::fcntl::FdFlags;
    use crate::vfs::{NodeOps, NodeType, OpenFlags, VfsNode};
    use alloc::sync::Arc;

    fn proc() -> Process {
        Process::new(1, 0)
    }

    test_case!(test_single_segment_example, {
        let image = ElfBuilder::new(0x1000)
            .segment(PT_LOAD, 0x1000, &[0xAA, 0xBB, 0xCC, 0xDD], 8, PF_W | 4)
            .build();
        let mut space = RecordingSpace::new();
        let p = proc();

        kassert!(load_image(&image, &mut space, &p) == Ok(0x1000));
        kassert!(space.read(0x1000, 4) == [0xAA, 0xBB, 0xCC, 0xDD]);
        kassert!(space.read(0x1004, 4) == [0, 0, 0, 0]);
        kassert!(p.program_break() == 0x1008);
        kassert!(space.maps() == [(0x1000, 0x1008, true)]);
    });

    test_case!(test_segments_copied_and_tails_zeroed, {
        let text: alloc::vec::Vec<u8> = (1..=32).collect();
        let data = [7u8; 5];
        let image = ElfBuilder::new(0x8048000)
            .segment(PT_LOAD, 0x8048000, &text, 32, 5)
            .segment(PT_LOAD, 0x8049000, &data, 0x40, 6)
            .build();
        let mut space = RecordingSpace::poisoned();
        let p = proc();

        load_image(&image, &mut space, &p).unwrap();
        kassert!(space.read(0x8048000, 32) == text);
        kassert!(space.read(0x8049000, 5) == data);
        kassert!(space.read(0x8049005, 0x40 - 5).iter().all(|&b| b == 0));
        // 只写标志决定可写性
        kassert!(space.maps() == [(0x8048000, 0x8048020, false), (0x8049000, 0x8049040, true)]);
    });

    test_case!(test_image_cross_checked_with_xmas_elf, {
        let image = ElfBuilder::new(0x2000)
            .segment(PT_LOAD, 0x2000, &[1, 2, 3], 16, PF_W | 4)
            .build();
        let elf = xmas_elf::ElfFile::new(&image).unwrap();
        kassert!(elf.header.pt2.entry_point() == 0x2000);
        kassert!(elf.header.pt2.machine().as_machine() == xmas_elf::header::Machine::X86);
        kassert!(matches!(
            elf.header.pt2.type_().as_type(),
            xmas_elf::header::Type::Executable
        ));
        let ph = elf.program_iter().next().unwrap();
        kassert!(ph.get_type() == Ok(xmas_elf::program::Type::Load));
        kassert!(ph.virtual_addr() == 0x2000);
        kassert!(ph.mem_size() == 16 && ph.file_size() == 3);
        kassert!(ph.flags().is_write());
    });

    test_case!(test_program_break_independent_of_order, {
        let a = ElfBuilder::new(0x1000)
            .segment(PT_LOAD, 0x1000, &[1], 0x10, 4)
            .segment(PT_LOAD, 0x5000, &[2], 0x300, 6)
            .segment(PT_LOAD, 0x3000, &[3], 0x20, 6)
            .build();
        let b = ElfBuilder::new(0x1000)
            .segment(PT_LOAD, 0x3000, &[3], 0x20, 6)
            .segment(PT_LOAD, 0x5000, &[2], 0x300, 6)
            .segment(PT_LOAD, 0x1000, &[1], 0x10, 4)
            .build();

        let (pa, pb) = (proc(), proc());
        load_image(&a, &mut RecordingSpace::new(), &pa).unwrap();
        load_image(&b, &mut RecordingSpace::new(), &pb).unwrap();
        kassert!(pa.program_break() == 0x5300);
        kassert!(pb.program_break() == 0x5300);
    });

    test_case!(test_rejections_never_map, {
        let good = ElfBuilder::new(0x1000)
            .segment(PT_LOAD, 0x1000, &[1, 2], 4, 6)
            .build();
        let cases: [(usize, u8, ElfRejection); 5] = [
            (0, 0x7e, ElfRejection::BadMagic),
            (4, 2, ElfRejection::BadClass),
            (5, 2, ElfRejection::BadEncoding),
            (18, 0x3e, ElfRejection::BadMachine),
            (16, 3, ElfRejection::NotExecType),
        ];
        for (offset, value, reason) in cases {
            let mut image = good.clone();
            image[offset] = value;
            let mut space = RecordingSpace::new();
            let p = proc();
            kassert!(load_image(&image, &mut space, &p) == Err(ExecError::NotExecutable(reason)));
            kassert!(space.maps().is_empty());
            kassert!(p.program_break() == 0);
        }
    });

    test_case!(test_version_below_minimum, {
        let mut image = ElfBuilder::new(0x1000)
            .segment(PT_LOAD, 0x1000, &[1], 1, 4)
            .build();
        image[6] = 0;
        let mut space = RecordingSpace::new();
        let err = load_image(&image, &mut space, &proc()).unwrap_err();
        kassert!(err == ExecError::NotExecutable(ElfRejection::BadVersion));
        kassert!(err.to_errno() == -(ENOEXEC as isize));
    });

    test_case!(test_filesz_larger_than_memsz, {
        let image = ElfBuilder::new(0x1000)
            .segment(PT_LOAD, 0x1000, &[1], 1, 4)
            .segment(PT_LOAD, 0x2000, &[1, 2, 3, 4], 2, 4)
            .build();
        let mut space = RecordingSpace::new();
        let result = load_image(&image, &mut space, &proc());
        kassert!(result == Err(ExecError::NotExecutable(ElfRejection::SegmentTooLarge)));
        // 第一个合法段也没有被映射
        kassert!(space.maps().is_empty());
    });

    test_case!(test_null_segments_skipped, {
        let image = ElfBuilder::new(0x1000)
            .segment(PT_NULL, 0, &[9, 9, 9], 0, 0)
            .segment(PT_LOAD, 0x1000, &[1], 1, 4)
            .build();
        let mut space = RecordingSpace::new();
        kassert!(load_image(&image, &mut space, &proc()).is_ok());
        kassert!(space.maps().len() == 1);
    });

    test_case!(test_truncated_tables_rejected, {
        let image = ElfBuilder::new(0x1000)
            .segment(PT_LOAD, 0x1000, &[1, 2, 3, 4], 4, 4)
            .build();
        // 截掉段数据
        let short = &image[..image.len() - 2];
        let mut space = RecordingSpace::new();
        kassert!(
            load_image(short, &mut space, &proc())
                == Err(ExecError::NotExecutable(ElfRejection::Truncated))
        );
        // 只剩文件头的一部分
        kassert!(
            load_image(&image[..20], &mut space, &proc())
                == Err(ExecError::NotExecutable(ElfRejection::Truncated))
        );
        kassert!(space.maps().is_empty());
    });

    test_case!(test_section_table_bounds_checked, {
        let image = ElfBuilder::new(0x1000)
            .segment(PT_LOAD, 0x1000, &[1], 1, 4)
            .sections(3)
            .build();
        kassert!(load_image(&image, &mut RecordingSpace::new(), &proc()).is_ok());

        let mut bad = image.clone();
        // e_shoff 指向映像末尾之后
        bad[32..36].copy_from_slice(&0xFFFF_0000u32.to_le_bytes());
        kassert!(
            load_image(&bad, &mut RecordingSpace::new(), &proc())
                == Err(ExecError::NotExecutable(ElfRejection::Truncated))
        );
    });

    test_case!(test_no_load_segment, {
        let image = ElfBuilder::new(0x1000).build();
        kassert!(
            load_image(&image, &mut RecordingSpace::new(), &proc())
                == Err(ExecError::NotExecutable(ElfRejection::NoLoadableSegment))
        );
    });

    test_case!(test_map_failure_reported, {
        let image = ElfBuilder::new(0x1000)
            .segment(PT_LOAD, 0x1000, &[1], 1, 4)
            .build();
        let mut space = RecordingSpace::new();
        space.fail_maps_with(MapError::OutOfMemory);
        let err = load_image(&image, &mut space, &proc()).unwrap_err();
        kassert!(err == ExecError::Map(MapError::OutOfMemory));
        kassert!(err.errno() == ENOMEM);
    });

    struct Inert;
    impl NodeOps for Inert {}

    test_case!(test_execute_sweeps_cloexec_on_success_only, {
        let p = proc();
        let node = Arc::new(VfsNode::new("f", NodeType::File, 0, 0, Arc::new(Inert)));
        let keep = p
            .fd_table()
            .register(node.clone(), FdFlags::empty(), OpenFlags::O_RDONLY)
            .unwrap();
        let drop_fd = p
            .fd_table()
            .register(node.clone(), FdFlags::CLOEXEC, OpenFlags::O_RDONLY)
            .unwrap();

        let bad = alloc::vec![0u8; 64];
        kassert!(execute(&p, &bad, &mut RecordingSpace::new()).is_err());
        kassert!(p.fd_table().get(drop_fd).is_ok());

        let good = ElfBuilder::new(0x1000)
            .segment(PT_LOAD, 0x1000, &[1], 1, 4)
            .build();
        kassert!(execute(&p, &good, &mut RecordingSpace::new()) == Ok(0x1000));
        kassert!(p.fd_table().get(keep).is_ok());
        kassert!(p.fd_table().get(drop_fd).is_err());
    });
}
