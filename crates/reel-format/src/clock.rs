//! 墙上时钟.
//!
//! 调度器只需要一个单调递增的毫秒计数; 测试与无头解码使用手动推进的时钟.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// 单调毫秒时钟
pub trait WallClock: Send {
    /// 自某个固定起点以来经过的毫秒数
    fn millis(&self) -> u64;
}

/// 系统时钟
pub struct SystemClock {
    /// 时钟创建时间
    origin: Instant,
}

impl SystemClock {
    /// 创建新时钟, 以当前时刻为起点
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock for SystemClock {
    fn millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// 手动推进的时钟 (线程安全, 克隆共享同一时间)
#[derive(Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    /// 创建新时钟, 初始为 0
    pub fn new() -> Self {
        Self::default()
    }

    /// 前进若干毫秒
    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::Relaxed);
    }

    /// 设置为指定时刻
    pub fn set(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::Relaxed);
    }
}

impl WallClock for ManualClock {
    fn millis(&self) -> u64 {
        self.now_ms.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_手动时钟_克隆共享() {
        let clock = ManualClock::new();
        let view = clock.clone();
        clock.advance(40);
        clock.advance(2);
        assert_eq!(view.millis(), 42);
        view.set(7);
        assert_eq!(clock.millis(), 7);
    }

    #[test]
    fn test_系统时钟_单调() {
        let clock = SystemClock::new();
        let a = clock.millis();
        let b = clock.millis();
        assert!(b >= a);
    }
}
