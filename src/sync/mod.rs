//! 同步原语
//!
//! 向子系统其它模块提供自旋锁。读多写少的表直接使用 `spin::RwLock`。
mod raw_spin_lock;

pub use raw_spin_lock::RawSpinLock;

/// 基于 [`RawSpinLock`] 的互斥锁，守卫离开作用域时自动释放
pub type SpinLock<T> = lock_api::Mutex<RawSpinLock, T>;

/// [`SpinLock`] 的守卫类型
pub type SpinLockGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinLock, T>;
