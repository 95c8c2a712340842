//! 视频编解码器接口.
//!
//! 容器把每个视频帧的完整负载交给编解码器, 编解码器返回整帧画面.

use reel_core::{PixelFormat, ReelResult};

use crate::palette::Palette;
use crate::surface::Surface;

/// 视频编解码器 trait
///
/// 编解码器可以保留帧间状态 (参考帧等), 因此必须按解码顺序依次送入数据.
/// 重新定位到关键帧之前由调用方重新创建实例.
pub trait VideoCodec: Send {
    /// 编解码器名称
    fn name(&self) -> &str;

    /// 解码一帧
    ///
    /// 返回 `Ok(None)` 表示本帧没有产生新画面 (例如丢帧标记),
    /// 调用方保留上一帧画面.
    fn decode_frame(&mut self, data: &[u8]) -> ReelResult<Option<Surface>>;

    /// 输出画面的像素格式
    fn pixel_format(&self) -> PixelFormat;

    /// 编解码器是否自带调色板 (此时容器调色板被忽略)
    fn contains_palette(&self) -> bool {
        false
    }

    /// 编解码器自带的调色板
    fn palette(&self) -> Option<&Palette> {
        None
    }

    /// 编解码器调色板自上次读取后是否变化
    fn has_dirty_palette(&self) -> bool {
        false
    }

    /// 标记编解码器调色板已被读取
    fn mark_palette_clean(&mut self) {}

    /// 是否支持抖动输出到固定调色板
    fn can_dither(&self) -> bool {
        false
    }

    /// 设置抖动目标调色板
    fn set_dither(&mut self, _palette: &Palette) {}
}
