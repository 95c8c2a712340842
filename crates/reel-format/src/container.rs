//! 媒体容器 trait 定义.
//!
//! 容器负责从字节源中按轨道拉取数据, 并把数据交给轨道解码.
//! 调度器 ([`crate::VideoDecoder`]) 只通过此 trait 驱动容器.
//!
//! 使用流程:
//! 1. 调用 `load()` 解析头部并建立轨道
//! 2. 循环调用 `read_next_packet()`, 每次为视频轨道取得一帧, 并为音频轨道补足提前量
//! 3. 可选: 调用 `seek_intern()` / `rewind_intern()` 重新定位
//! 4. 调用 `close()` 释放字节源、编解码器与音频流

use reel_core::{ReelResult, Timestamp};

use crate::io::IoContext;
use crate::track::{AudioTrack, VideoTrack};

/// 媒体容器 trait
pub trait MediaContainer: Send {
    /// 容器格式名称
    fn name(&self) -> &str;

    /// 解析容器头部并建立轨道
    ///
    /// 失败时不保留任何部分状态.
    fn load(&mut self, io: IoContext) -> ReelResult<()>;

    /// 释放字节源与所有轨道
    fn close(&mut self);

    /// 是否已加载
    fn is_loaded(&self) -> bool;

    /// 是否支持定位 (需要可随机访问的字节源与索引)
    fn is_seekable(&self) -> bool;

    /// 为视频轨道读取一帧, 随后为每条音频轨道补充数据
    ///
    /// # 返回
    /// - `Ok(true)`: 视频轨道解码了一帧 (可能是重复的上一帧)
    /// - `Ok(false)`: 没有读到新帧 (数据结束, 视频轨道已被强制到最后一帧)
    fn read_next_packet(&mut self) -> ReelResult<bool>;

    /// 视频轨道
    fn video_track(&self) -> Option<&VideoTrack>;

    /// 视频轨道 (可变)
    fn video_track_mut(&mut self) -> Option<&mut VideoTrack>;

    /// 音频轨道数量
    fn audio_track_count(&self) -> usize;

    /// 第 `index` 条音频轨道
    fn audio_track(&self, index: usize) -> Option<&AudioTrack>;

    /// 把所有轨道定位到 `time`
    fn seek_intern(&mut self, time: Timestamp) -> ReelResult<()>;

    /// 把所有轨道回到开头
    fn rewind_intern(&mut self) -> ReelResult<()>;
}
