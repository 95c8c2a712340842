//! 像素格式定义.
//!
//! 只包含 AVI 回放需要的打包格式: 调色板索引与若干 RGB 排列.

use std::fmt;

/// 像素格式
///
/// 定义了解码画面中每个像素的数据排列方式.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// 未指定
    None,
    /// 8 位调色板索引
    Pal8,
    /// RGB 5:5:5 小端 (最高位保留)
    Rgb555le,
    /// RGB 5:6:5 小端
    Rgb565le,
    /// BGR 各 8 位, 打包
    Bgr24,
    /// BGRA 各 8 位, 打包
    Bgra,
}

impl PixelFormat {
    /// 每个像素占用的字节数
    pub const fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Pal8 => 1,
            Self::Rgb555le | Self::Rgb565le => 2,
            Self::Bgr24 => 3,
            Self::Bgra => 4,
        }
    }

    /// 是否为调色板格式
    pub const fn is_paletted(&self) -> bool {
        matches!(self, Self::Pal8)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Pal8 => "pal8",
            Self::Rgb555le => "rgb555le",
            Self::Rgb565le => "rgb565le",
            Self::Bgr24 => "bgr24",
            Self::Bgra => "bgra",
        };
        write!(f, "{name}")
    }
}
