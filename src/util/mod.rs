//! 通用数据结构
pub mod ring_buffer;

pub use ring_buffer::RingBuffer;
