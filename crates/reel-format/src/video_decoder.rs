//! 回放调度器.
//!
//! 调度器把墙上时钟、容器与混音器串在一起:
//! - 以墙上时钟推算媒体时间, 暂停时冻结
//! - 按需驱动容器读取下一帧 (同时为音频补足提前量)
//! - 开始播放时把音频流交给混音器, 停止、定位或回退时解除绑定
//!
//! 调度器只在调用方线程上运行, `decode_next_frame` 与 `seek` 不会并发调用.
//! 唯一跨线程的对象是各音频轨道交给混音器的音频流.

use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};
use reel_codec::{CodecRegistry, Palette, Surface};
use reel_core::{PixelFormat, Rational, ReelError, ReelResult, Timestamp};

use crate::avi::AviDemuxer;
use crate::clock::WallClock;
use crate::container::MediaContainer;
use crate::io::IoContext;
use crate::mixer::{Mixer, SoundHandle, SoundType};
use crate::track::AudioTrack;

/// 调度器配置
#[derive(Debug, Clone, Copy, Default)]
pub struct VideoDecoderConfig {
    /// 绑定音频轨道时原样交给混音器的声音类型
    pub sound_type: SoundType,
    /// 帧率覆盖, 分子或分母为 0 时忽略
    pub frame_rate_override: Option<Rational>,
}

/// 回放调度器
pub struct VideoDecoder {
    /// 容器
    container: Box<dyn MediaContainer>,
    /// 墙上时钟
    clock: Box<dyn WallClock>,
    /// 混音器
    mixer: Box<dyn Mixer>,
    /// 是否正在播放
    playing: bool,
    /// 是否已暂停
    paused: bool,
    /// 锚点对应的媒体时间 (毫秒)
    anchor_media_ms: i64,
    /// 锚点对应的墙上时间 (毫秒)
    anchor_wall_ms: u64,
    /// 已绑定到混音器的声音
    sound_handles: Vec<SoundHandle>,
}

impl VideoDecoder {
    /// 以任意容器创建调度器
    pub fn new(
        container: Box<dyn MediaContainer>,
        clock: Box<dyn WallClock>,
        mixer: Box<dyn Mixer>,
    ) -> Self {
        Self {
            container,
            clock,
            mixer,
            playing: false,
            paused: false,
            anchor_media_ms: 0,
            anchor_wall_ms: 0,
            sound_handles: Vec::new(),
        }
    }

    /// 创建 AVI 调度器
    pub fn avi(
        config: &VideoDecoderConfig,
        registry: Arc<CodecRegistry>,
        clock: Box<dyn WallClock>,
        mixer: Box<dyn Mixer>,
    ) -> Self {
        Self::new(AviDemuxer::create(registry, config), clock, mixer)
    }

    // ========================
    // 加载
    // ========================

    /// 从字节源加载
    ///
    /// 失败时调度器保持关闭状态.
    pub fn load(&mut self, io: IoContext) -> ReelResult<()> {
        self.close();
        self.container.load(io)?;
        if let Some(track) = self.container.video_track() {
            info!(
                "{} 已加载: {}x{}, {} 帧, 时长 {}, {} 个音频轨道",
                self.container.name(),
                track.width(),
                track.height(),
                track.frame_count(),
                track.duration(),
                self.container.audio_track_count()
            );
        }
        Ok(())
    }

    /// 打开文件并加载
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> ReelResult<()> {
        let path = path.as_ref();
        debug!("打开文件: {}", path.display());
        self.load(IoContext::open_read(path)?)
    }

    /// 关闭: 停止播放并释放字节源、编解码器与音频流
    pub fn close(&mut self) {
        self.stop();
        self.container.close();
        self.paused = false;
        self.anchor_media_ms = 0;
        self.anchor_wall_ms = 0;
    }

    /// 是否已加载
    pub fn is_loaded(&self) -> bool {
        self.container.is_loaded()
    }

    // ========================
    // 播放控制
    // ========================

    /// 开始播放: 记录时间原点并把音频流交给混音器
    pub fn start(&mut self) {
        if !self.is_loaded() || self.playing {
            return;
        }
        self.playing = true;
        self.anchor_wall_ms = self.clock.millis();
        self.bind_audio();
        debug!("开始播放, 媒体时间 {} ms", self.anchor_media_ms);
    }

    /// 停止播放: 冻结时间并解除音频绑定
    pub fn stop(&mut self) {
        if !self.playing {
            return;
        }
        self.anchor_media_ms = self.time_millis();
        self.playing = false;
        self.unbind_audio();
        debug!("停止播放, 媒体时间 {} ms", self.anchor_media_ms);
    }

    /// 暂停或恢复
    pub fn pause_video(&mut self, pause: bool) {
        if pause == self.paused {
            return;
        }
        if pause {
            self.anchor_media_ms = self.time_millis();
            self.paused = true;
        } else {
            self.paused = false;
            self.anchor_wall_ms = self.clock.millis();
        }
        for &handle in &self.sound_handles {
            self.mixer.pause_handle(handle, pause);
        }
    }

    /// 是否正在播放
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// 是否已暂停
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// 视频是否已到结尾 (未加载时为 true)
    pub fn end_of_video(&self) -> bool {
        self.container
            .video_track()
            .is_none_or(|track| track.end_of_track())
    }

    /// 是否支持定位
    pub fn is_seekable(&self) -> bool {
        self.container.is_seekable()
    }

    /// 是否到了显示下一帧的时间
    pub fn needs_update(&self) -> bool {
        if !self.playing || self.paused || self.end_of_video() {
            return false;
        }
        self.get_time() >= self.get_next_frame_start_time()
    }

    // ========================
    // 解码
    // ========================

    /// 解码下一帧
    ///
    /// 已到结尾时不读取字节源, 直接返回 `None`; 本次调用只是发现数据提前结束时也返回 `None`.
    /// 空帧或解码失败的帧返回上一帧画面.
    pub fn decode_next_frame(&mut self) -> Option<&Surface> {
        if !self.is_loaded() || self.end_of_video() {
            return None;
        }
        match self.container.read_next_packet() {
            Ok(true) => self.container.video_track().and_then(|track| track.surface()),
            Ok(false) => None,
            Err(e) => {
                warn!("读取视频帧失败: {e}, 视为视频结束");
                if let Some(track) = self.container.video_track_mut() {
                    track.force_track_end();
                }
                None
            }
        }
    }

    /// 当前帧号 (-1 表示尚未解码)
    pub fn get_current_frame(&self) -> i64 {
        self.container
            .video_track()
            .map_or(-1, |track| track.cur_frame())
    }

    /// 总帧数
    pub fn get_frame_count(&self) -> u32 {
        self.container
            .video_track()
            .map_or(0, |track| track.frame_count())
    }

    /// 视频帧率 (可能已被覆盖)
    pub fn frame_rate(&self) -> Rational {
        self.container
            .video_track()
            .map_or(Rational::UNDEFINED, |track| track.frame_rate())
    }

    /// 总时长
    pub fn get_duration(&self) -> Timestamp {
        self.container
            .video_track()
            .map_or(Timestamp::ZERO, |track| track.duration())
    }

    /// 下一帧的开始时间
    pub fn get_next_frame_start_time(&self) -> Timestamp {
        self.container
            .video_track()
            .map_or(Timestamp::ZERO, |track| track.next_frame_start_time())
    }

    /// 当前媒体时间 (毫秒), 暂停或停止时冻结
    fn time_millis(&self) -> i64 {
        if self.playing && !self.paused {
            let elapsed = self.clock.millis().saturating_sub(self.anchor_wall_ms);
            self.anchor_media_ms + elapsed as i64
        } else {
            self.anchor_media_ms
        }
    }

    /// 当前媒体时间
    pub fn get_time(&self) -> Timestamp {
        Timestamp::from_millis(self.time_millis())
    }

    // ========================
    // 定位
    // ========================

    /// 定位到 `time`
    ///
    /// 定位后 `get_time()` 立即返回 `time`; 正在播放时音频流会重新绑定.
    pub fn seek(&mut self, time: Timestamp) -> ReelResult<()> {
        if !self.is_loaded() {
            return Err(ReelError::NotLoaded);
        }
        if !self.is_seekable() {
            return Err(ReelError::NotSeekable);
        }

        debug!("定位到 {time}");
        self.unbind_audio();
        let result = self.container.seek_intern(time);
        if result.is_ok() {
            self.anchor_media_ms = time.to_millis();
            self.anchor_wall_ms = self.clock.millis();
            debug!("定位完成, 当前帧 {}", self.get_current_frame());
        }
        if self.playing {
            self.bind_audio();
        }
        result
    }

    /// 回到开头
    pub fn rewind(&mut self) -> ReelResult<()> {
        if !self.is_loaded() {
            return Err(ReelError::NotLoaded);
        }

        self.unbind_audio();
        let result = self.container.rewind_intern();
        if result.is_ok() {
            self.anchor_media_ms = 0;
            self.anchor_wall_ms = self.clock.millis();
        }
        if self.playing {
            self.bind_audio();
        }
        result
    }

    // ========================
    // 轨道与画面属性
    // ========================

    /// 音频轨道数量
    pub fn audio_track_count(&self) -> usize {
        self.container.audio_track_count()
    }

    /// 第 `index` 条音频轨道
    pub fn get_audio_track(&self, index: usize) -> Option<&AudioTrack> {
        self.container.audio_track(index)
    }

    /// 宽度
    pub fn width(&self) -> u32 {
        self.container.video_track().map_or(0, |track| track.width())
    }

    /// 高度
    pub fn height(&self) -> u32 {
        self.container.video_track().map_or(0, |track| track.height())
    }

    /// 输出像素格式
    pub fn pixel_format(&self) -> PixelFormat {
        self.container
            .video_track()
            .map_or(PixelFormat::None, |track| track.pixel_format())
    }

    /// 调色板自上次读取后是否变化
    pub fn has_dirty_palette(&self) -> bool {
        self.container
            .video_track()
            .is_some_and(|track| track.has_dirty_palette())
    }

    /// 读取调色板并清除变化标志
    pub fn get_palette(&mut self) -> Option<&Palette> {
        self.container.video_track_mut().map(|track| track.palette())
    }

    /// 编解码器是否支持抖动
    pub fn can_dither(&self) -> bool {
        self.container
            .video_track()
            .is_some_and(|track| track.can_dither())
    }

    /// 设置抖动目标调色板
    pub fn set_dither_palette(&mut self, palette: &Palette) -> ReelResult<()> {
        let track = self
            .container
            .video_track_mut()
            .ok_or(ReelError::NotLoaded)?;
        if !track.can_dither() {
            return Err(ReelError::Unsupported(format!(
                "编解码器 {} 不支持抖动",
                track.codec_name()
            )));
        }
        track.set_dither(palette);
        Ok(())
    }

    // ========================
    // 混音器绑定
    // ========================

    fn bind_audio(&mut self) {
        for i in 0..self.container.audio_track_count() {
            let Some(track) = self.container.audio_track(i) else {
                continue;
            };
            let handle = self
                .mixer
                .play_stream(track.sound_type(), track.audio_stream());
            if self.paused {
                self.mixer.pause_handle(handle, true);
            }
            self.sound_handles.push(handle);
        }
    }

    fn unbind_audio(&mut self) {
        for handle in self.sound_handles.drain(..) {
            self.mixer.stop_handle(handle);
        }
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        self.close();
    }
}
