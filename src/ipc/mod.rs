//! 进程间通信
pub mod pipe;

pub use pipe::{Pipe, PipeKind, PipeOps, PipeRingBuffer, create_pipe, make_fifo};
