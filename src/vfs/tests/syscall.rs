use super::*;
use crate::kernel::syscall;
use crate::test::doubles::{ElfBuilder, RecordingSpace};
use crate::uapi::errno::{EBADF, EEXIST, EINVAL, ENOENT, ENOEXEC};
use crate::uapi::fcntl::FcntlCmd;
use crate::vfs::OpenFlags;
use alloc::vec::Vec;

fn err(errno: i32) -> isize {
    -(errno as isize)
}

fn new_pipe(f: &Fixture, flags: u32) -> [i32; 2] {
    let mut fds = [-1; 2];
    kassert!(syscall::pipe2(&f.ctx, &mut fds, flags) == 0);
    fds
}

test_case!(test_pipe_round_trip, {
    let f = fixture();
    let mut fds = [-1; 2];
    kassert!(syscall::pipe(&f.ctx, &mut fds) == 0);
    kassert!(fds == [0, 1]);

    kassert!(syscall::write(&f.ctx, fds[1], b"ping") == 4);
    let mut buf = [0u8; 8];
    kassert!(syscall::read(&f.ctx, fds[0], &mut buf) == 4);
    kassert!(&buf[..4] == b"ping");
});

test_case!(test_wrong_end_is_bad_descriptor, {
    let f = fixture();
    let fds = new_pipe(&f, 0);
    let mut buf = [0u8; 4];
    kassert!(syscall::read(&f.ctx, fds[1], &mut buf) == err(EBADF));
    kassert!(f.process.last_error() == EBADF);
    kassert!(syscall::write(&f.ctx, fds[0], b"x") == err(EBADF));
});

test_case!(test_pipe2_rejects_unknown_flags, {
    let f = fixture();
    let mut fds = [-1; 2];
    kassert!(syscall::pipe2(&f.ctx, &mut fds, OpenFlags::O_APPEND.bits()) == err(EINVAL));
    kassert!(fds == [-1, -1]);
    kassert!(f.process.fd_table().open_count() == 0);
});

test_case!(test_blocking_pipe_read, {
    let f = Arc::new(fixture());
    let fds = new_pipe(&f, 0);

    let reader = {
        let f = f.clone();
        std::thread::spawn(move || {
            let mut buf = [0u8; 8];
            let n = syscall::read(&f.ctx, fds[0], &mut buf);
            Vec::from(&buf[..n as usize])
        })
    };
    std::thread::sleep(std::time::Duration::from_millis(20));
    kassert!(syscall::write(&f.ctx, fds[1], b"late") == 4);
    kassert!(reader.join().unwrap() == b"late");
});

test_case!(test_reader_sees_eof_after_every_writer_closes, {
    let f = Arc::new(fixture());
    let fds = new_pipe(&f, 0);
    let child = f.process.fork(2);

    let reader = {
        let f = f.clone();
        std::thread::spawn(move || {
            let mut buf = [0u8; 8];
            syscall::read(&f.ctx, fds[0], &mut buf)
        })
    };
    std::thread::sleep(std::time::Duration::from_millis(20));
    kassert!(syscall::close(&f.ctx, fds[1]) == 0);
    child.exit(f.ctx.lock_table());

    kassert!(reader.join().unwrap() == 0);
});

test_case!(test_dup2_survives_close_of_source, {
    let f = fixture();
    let fds = new_pipe(&f, 0);
    kassert!(syscall::dup2(&f.ctx, fds[0], 9) == 9);
    kassert!(syscall::close(&f.ctx, fds[0]) == 0);

    syscall::write(&f.ctx, fds[1], b"dup");
    let mut buf = [0u8; 3];
    kassert!(syscall::read(&f.ctx, 9, &mut buf) == 3);
    kassert!(&buf == b"dup");

    kassert!(syscall::dup2(&f.ctx, 30, 31) == err(EBADF));
    kassert!(syscall::dup2(&f.ctx, 9, -4) == err(EBADF));
});

test_case!(test_dup_takes_lowest_free_slot, {
    let f = fixture();
    let fds = new_pipe(&f, 0);
    kassert!(syscall::close(&f.ctx, fds[0]) == 0);
    kassert!(syscall::dup(&f.ctx, fds[1]) == 0);
    kassert!(syscall::dup(&f.ctx, fds[1]) == 2);
    kassert!(syscall::dup(&f.ctx, 17) == err(EBADF));
});

test_case!(test_close_is_idempotent, {
    let f = fixture();
    let fds = new_pipe(&f, 0);
    kassert!(syscall::close(&f.ctx, fds[1]) == 0);
    kassert!(syscall::close(&f.ctx, fds[1]) == 0);
    kassert!(syscall::close(&f.ctx, 200) == 0);
    kassert!(syscall::close(&f.ctx, -1) == 0);
});

test_case!(test_fcntl_commands, {
    let f = fixture();
    let flags = (OpenFlags::O_CLOEXEC | OpenFlags::O_NONBLOCK).bits();
    let fds = new_pipe(&f, flags);

    kassert!(syscall::fcntl(&f.ctx, fds[0], FcntlCmd::GetFd as i32, 0) == 1);
    kassert!(syscall::fcntl(&f.ctx, fds[0], FcntlCmd::SetFd as i32, 0) == 0);
    kassert!(syscall::fcntl(&f.ctx, fds[0], FcntlCmd::GetFd as i32, 0) == 0);

    let fl = syscall::fcntl(&f.ctx, fds[0], FcntlCmd::GetFl as i32, 0) as u32;
    kassert!(fl & OpenFlags::O_NONBLOCK.bits() != 0);
    kassert!(syscall::fcntl(&f.ctx, fds[0], FcntlCmd::SetFl as i32, 0) == 0);
    let fl = syscall::fcntl(&f.ctx, fds[0], FcntlCmd::GetFl as i32, 0) as u32;
    kassert!(fl & OpenFlags::O_NONBLOCK.bits() == 0);

    kassert!(syscall::fcntl(&f.ctx, fds[1], FcntlCmd::DupFd as i32, 10) == 10);
    kassert!(syscall::fcntl(&f.ctx, fds[1], 99, 0) == err(EINVAL));
});

test_case!(test_regular_file_cursor, {
    let f = fixture();
    let inode = f.fs.add_file("/notes", b"0123456789").unwrap();
    let fd = syscall::open(&f.ctx, "/notes", OpenFlags::O_RDWR.bits()) as i32;
    kassert!(fd >= 0);

    let mut buf = [0u8; 4];
    kassert!(syscall::read(&f.ctx, fd, &mut buf) == 4);
    kassert!(&buf == b"0123");
    kassert!(syscall::read(&f.ctx, fd, &mut buf) == 4);
    kassert!(&buf == b"4567");

    kassert!(syscall::write(&f.ctx, fd, b"XY") == 2);
    kassert!(f.fs.contents(inode) == b"01234567XY");
    kassert!(syscall::read(&f.ctx, fd, &mut buf) == 0);
});

test_case!(test_append_mode, {
    let f = fixture();
    let inode = f.fs.add_file("/log", b"abc").unwrap();
    let flags = OpenFlags::O_WRONLY | OpenFlags::O_APPEND;
    let fd = syscall::open(&f.ctx, "/log", flags.bits()) as i32;

    kassert!(syscall::write(&f.ctx, fd, b"de") == 2);
    kassert!(syscall::write(&f.ctx, fd, b"f") == 1);
    kassert!(f.fs.contents(inode) == b"abcdef");
    kassert!(f.ctx.lookup("/log").unwrap().size() == 6);
});

test_case!(test_open_missing_path, {
    let f = fixture();
    kassert!(syscall::open(&f.ctx, "/nope", 0) == err(ENOENT));
    kassert!(f.process.last_error() == ENOENT);
    kassert!(syscall::open(&f.ctx, "/nope", 0xdead_0000) == err(EINVAL));
});

test_case!(test_mkfifo_then_open, {
    let f = fixture();
    kassert!(syscall::mkfifo(&f.ctx, "/run/ctl") == 0);
    kassert!(syscall::mkfifo(&f.ctx, "/run/ctl") == err(EEXIST));

    let w = syscall::open(&f.ctx, "/run/ctl", OpenFlags::O_WRONLY.bits()) as i32;
    let r = syscall::open(&f.ctx, "/run/ctl", OpenFlags::O_RDONLY.bits()) as i32;
    kassert!(syscall::write(&f.ctx, w, b"cmd") == 3);
    kassert!(syscall::close(&f.ctx, w) == 0);
    kassert!(syscall::close(&f.ctx, r) == 0);

    // 所有描述符关闭后数据仍在
    let r = syscall::open(&f.ctx, "/run/ctl", OpenFlags::O_RDONLY.bits()) as i32;
    let mut buf = [0u8; 3];
    kassert!(syscall::read(&f.ctx, r, &mut buf) == 3);
    kassert!(&buf == b"cmd");
});

test_case!(test_no_current_process, {
    let f = fixture();
    f.sched.set_current_process(None);
    let mut buf = [0u8; 1];
    kassert!(syscall::read(&f.ctx, 0, &mut buf) == err(EBADF));
    let mut fds = [-1; 2];
    kassert!(syscall::pipe(&f.ctx, &mut fds) == err(EBADF));
});

test_case!(test_execve_boundary, {
    let f = fixture();
    let keep = new_pipe(&f, 0);
    let gone = new_pipe(&f, OpenFlags::O_CLOEXEC.bits());

    let mut space = RecordingSpace::new();
    kassert!(syscall::execve(&f.ctx, b"#!/bin/sh\n", &mut space) == err(ENOEXEC));
    kassert!(f.process.last_error() == ENOEXEC);
    kassert!(f.process.fd_table().open_count() == 4);

    let image = ElfBuilder::new(0x8048000)
        .segment(1, 0x8048000, &[0x90; 16], 0x100, 4)
        .build();
    kassert!(syscall::execve(&f.ctx, &image, &mut space) == 0x8048000);
    kassert!(f.process.program_break() == 0x8048100);

    let table = f.process.fd_table();
    kassert!(table.get(keep[0] as usize).is_ok() && table.get(keep[1] as usize).is_ok());
    kassert!(table.get(gone[0] as usize).is_err() && table.get(gone[1] as usize).is_err());
});
