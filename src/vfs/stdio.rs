//! 标准输入输出设备
//!
//! `/dev/stdin` 是一个 fifo，写入它的字节经过行规程整理后按行送进管道，
//! 同时回显到标准输出；`/dev/stdout` 和 `/dev/stderr` 是字符设备，
//! 每次写入都同时送到串口和当前进程的控制终端，stderr 写入期间终端切换为红色。

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::config::STDIN_LINE_BUFSIZ;
use crate::device::{SerialPort, Terminal, TtyColor};
use crate::ipc::Pipe;
use crate::ipc::pipe::link_fifo;
use crate::kernel::{KernelContext, Process, Scheduler};
use crate::sync::SpinLock;
use crate::vfs::{FsError, NodeOps, NodeType, OpenFlags, VfsNode};
use crate::{pr_info, pr_warn};

const BACKSPACE: u8 = 0x08;

/// 标准输出
pub struct StdoutOps {
    terminal: Arc<dyn Terminal>,
    serial: Arc<dyn SerialPort>,
    sched: Arc<dyn Scheduler>,
}

impl StdoutOps {
    pub fn new(
        terminal: Arc<dyn Terminal>,
        serial: Arc<dyn SerialPort>,
        sched: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            terminal,
            serial,
            sched,
        }
    }

    /// 写入者的控制终端，没有当前进程时用 0 号终端
    fn current_tty(&self) -> usize {
        self.sched.current_process().map_or(0, |p| p.tty())
    }

    fn emit(&self, tty: usize, buf: &[u8]) {
        for &b in buf {
            self.serial.put(b);
        }
        self.terminal.write(tty, buf);
    }
}

impl NodeOps for StdoutOps {
    fn write(
        &self,
        _node: &VfsNode,
        _offset: usize,
        buf: &[u8],
        _flags: OpenFlags,
    ) -> Result<usize, FsError> {
        self.emit(self.current_tty(), buf);
        Ok(buf.len())
    }
}

/// 标准错误
pub struct StderrOps {
    out: Arc<StdoutOps>,
}

impl StderrOps {
    pub fn new(out: Arc<StdoutOps>) -> Self {
        Self { out }
    }
}

impl NodeOps for StderrOps {
    fn write(
        &self,
        _node: &VfsNode,
        _offset: usize,
        buf: &[u8],
        _flags: OpenFlags,
    ) -> Result<usize, FsError> {
        let tty = self.out.current_tty();
        self.out.terminal.set_color(tty, TtyColor::Red);
        self.out.emit(tty, buf);
        self.out.terminal.set_color(tty, TtyColor::White);
        Ok(buf.len())
    }
}

/// 标准输入
///
/// 键盘驱动把按键写进来；读者从管道里按行取数据。
pub struct StdinOps {
    pipe: Arc<Pipe>,
    line: SpinLock<Vec<u8>>,
    echo: Arc<StdoutOps>,
}

impl StdinOps {
    pub fn new(pipe: Arc<Pipe>, echo: Arc<StdoutOps>) -> Self {
        Self {
            pipe,
            line: SpinLock::new(Vec::with_capacity(STDIN_LINE_BUFSIZ)),
            echo,
        }
    }

    pub fn pipe(&self) -> &Arc<Pipe> {
        &self.pipe
    }

    /// 当前行中尚未送进管道的字节数
    pub fn pending_line_len(&self) -> usize {
        self.line.lock().len()
    }

    fn flush_line(&self, line: &mut Vec<u8>) {
        match self.pipe.write(line.as_slice(), true) {
            Ok(n) if n < line.len() => {
                pr_warn!("stdin: dropped {} bytes, buffer full", line.len() - n)
            }
            Ok(_) => {}
            Err(e) => pr_warn!("stdin: dropped line: {:?}", e),
        }
        line.clear();
    }
}

impl NodeOps for StdinOps {
    fn read(
        &self,
        _node: &VfsNode,
        _offset: usize,
        buf: &mut [u8],
        flags: OpenFlags,
    ) -> Result<usize, FsError> {
        self.pipe.read(buf, flags.contains(OpenFlags::O_NONBLOCK))
    }

    fn write(
        &self,
        _node: &VfsNode,
        _offset: usize,
        buf: &[u8],
        _flags: OpenFlags,
    ) -> Result<usize, FsError> {
        {
            let mut line = self.line.lock();
            for &b in buf {
                if b == BACKSPACE {
                    line.pop();
                    continue;
                }
                line.push(b);
                if b == b'\n' || line.len() >= STDIN_LINE_BUFSIZ {
                    self.flush_line(&mut line);
                }
            }
        }
        self.echo.emit(self.echo.current_tty(), buf);
        Ok(buf.len())
    }

    fn remove(&self, _node: &VfsNode, location: usize) -> Result<u8, FsError> {
        self.pipe.remove(location)
    }
}

/// 创建 `/dev/stdin`、`/dev/stdout`、`/dev/stderr`
pub fn init_char_specials(ctx: &KernelContext) -> Result<(), FsError> {
    let stdout = Arc::new(StdoutOps::new(
        ctx.terminal().clone(),
        ctx.serial().clone(),
        ctx.scheduler().clone(),
    ));

    let pipe = Pipe::create(0, ctx.scheduler().clone());
    let stdin = Arc::new(StdinOps::new(pipe.clone(), stdout.clone()));
    link_fifo(ctx.namespace(), "/dev/stdin", pipe, stdin)?;

    let stderr = Arc::new(StderrOps::new(stdout.clone()));
    ctx.namespace().link(
        "/dev/stdout",
        Arc::new(VfsNode::new("stdout", NodeType::CharDevice, 0, 0, stdout)),
    )?;
    ctx.namespace().link(
        "/dev/stderr",
        Arc::new(VfsNode::new("stderr", NodeType::CharDevice, 0, 0, stderr)),
    )?;

    pr_info!("standard streams linked under /dev");
    Ok(())
}

/// 为进程依次打开三个标准流，空表上得到 0、1、2
pub fn open_std_streams(ctx: &KernelContext, process: &Process) -> Result<[usize; 3], FsError> {
    let stdin = ctx.open(process, "/dev/stdin", OpenFlags::O_RDONLY)?;
    let stdout = ctx.open(process, "/dev/stdout", OpenFlags::O_WRONLY)?;
    let stderr = ctx.open(process, "/dev/stderr", OpenFlags::O_WRONLY)?;
    if [stdin, stdout, stderr] != [0, 1, 2] {
        pr_warn!(
            "pid {}: standard streams landed on {}, {}, {}",
            process.pid(),
            stdin,
            stdout,
            stderr
        );
    }
    Ok([stdin, stdout, stderr])
}
