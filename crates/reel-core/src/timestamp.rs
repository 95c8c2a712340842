//! 时间戳类型, 用于表示媒体流中的时间点.
//!
//! 时间戳由整数计数和时间基组成, 比较与换算都走整数交叉乘法.

use crate::rational::Rational;
use std::cmp::Ordering;
use std::fmt;

/// 时间戳
///
/// 包含一个整数值和对应的时间基 (time_base).
/// 实际时间 (秒) = pts * time_base.num / time_base.den.
///
/// 相等与大小比较按实际时间进行, 与时间基无关:
/// `1000 @ 1/1000` 与 `15 @ 1/15` 相等.
#[derive(Debug, Clone, Copy)]
pub struct Timestamp {
    /// 时间戳值
    pub pts: i64,
    /// 时间基
    pub time_base: Rational,
}

impl Timestamp {
    /// 创建新的时间戳
    pub const fn new(pts: i64, time_base: Rational) -> Self {
        Self { pts, time_base }
    }

    /// 零时刻 (毫秒时间基)
    pub const ZERO: Self = Self::new(0, Rational::MILLI);

    /// 以毫秒创建时间戳
    pub const fn from_millis(ms: i64) -> Self {
        Self::new(ms, Rational::MILLI)
    }

    /// 以帧 (或块、采样) 计数创建时间戳
    ///
    /// `rate` 为每秒的计数, 例如 15/1 fps 下第 30 帧对应 2 秒.
    pub const fn from_frames(frames: i64, rate: Rational) -> Self {
        Self::new(frames, rate.invert())
    }

    /// 转换为秒 (f64)
    pub fn to_seconds(&self) -> f64 {
        self.pts as f64 * self.time_base.to_f64()
    }

    /// 转换为毫秒 (向下取整)
    pub fn to_millis(&self) -> i64 {
        self.rescale(Rational::MILLI).pts
    }

    /// 换算为 `rate` 下的帧计数 (向下取整)
    pub fn frames_at(&self, rate: Rational) -> i64 {
        self.rescale(rate.invert()).pts
    }

    /// 增加若干毫秒
    ///
    /// 结果时间基为 1/(den*1000), 相加无精度损失;
    /// 分母溢出时退回原时间基并向下取整.
    pub fn add_millis(&self, ms: i64) -> Self {
        match self.time_base.den.checked_mul(1000) {
            Some(den) => Self::new(
                self.pts * i64::from(self.time_base.num) * 1000 + ms * i64::from(self.time_base.den),
                Rational::new(1, den),
            ),
            None => {
                let delta = Self::from_millis(ms).rescale(self.time_base);
                Self::new(self.pts + delta.pts, self.time_base)
            }
        }
    }

    /// 将时间戳重缩放到新的时间基 (向下取整)
    ///
    /// 通过交叉乘法避免浮点精度损失:
    /// new_pts = pts * old_tb.num * new_tb.den / (old_tb.den * new_tb.num)
    pub fn rescale(&self, new_time_base: Rational) -> Self {
        let num = self.pts as i128 * i128::from(self.time_base.num) * i128::from(new_time_base.den);
        let den = i128::from(self.time_base.den) * i128::from(new_time_base.num);
        if den == 0 {
            return Self::new(0, new_time_base);
        }
        Self {
            pts: num.div_euclid(den) as i64,
            time_base: new_time_base,
        }
    }

    /// 以 i128 计算的 (分子, 分母) 形式, 分母恒为正
    fn as_fraction(&self) -> (i128, i128) {
        let num = self.pts as i128 * i128::from(self.time_base.num);
        let den = i128::from(self.time_base.den);
        if den < 0 { (-num, -den) } else { (num, den) }
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        let (an, ad) = self.as_fraction();
        let (bn, bd) = other.as_fraction();
        (an * bd).cmp(&(bn * ad))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.to_seconds())
    }
}
