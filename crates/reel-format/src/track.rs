//! 回放轨道.
//!
//! 视频轨道持有编解码器、最近一帧画面与调色板; 音频轨道持有包队列音频流.
//! 两者都只记录自身的帧/块计数, 从容器读取数据由解封装器负责.

use std::sync::Arc;

use log::{debug, warn};
use reel_codec::audio::known_format_name;
use reel_codec::{
    AudioStream, AudioStreamHandle, CodecRegistry, PacketDecoder, PacketizedAudioStream, Palette,
    Surface, VideoCodec,
};
use reel_core::{PixelFormat, Rational, ReelResult, Timestamp};

use crate::avi::header::{BitmapInfoHeader, StreamHeader, WaveFormat};
use crate::mixer::SoundType;

/// 容器特定的音频解码器工厂
///
/// 返回 `None` 时回退到注册表中的内置解码器.
pub type AudioStreamFactory = fn(&WaveFormat) -> Option<ReelResult<Box<dyn PacketDecoder>>>;

// ========================
// 视频轨道
// ========================

/// 视频轨道
pub struct VideoTrack {
    /// 流头 (rate/scale 可能已被帧率覆盖替换)
    header: StreamHeader,
    /// 位图信息头
    bitmap_info: BitmapInfoHeader,
    /// 编解码器注册表, 回退时用于重建编解码器
    registry: Arc<CodecRegistry>,
    /// 当前编解码器
    codec: Box<dyn VideoCodec>,
    /// 总帧数
    frame_count: u32,
    /// 当前帧号, -1 表示尚未解码任何帧
    cur_frame: i64,
    /// 最近一帧画面
    surface: Option<Surface>,
    /// 当前调色板
    palette: Palette,
    /// 初始调色板 (strf 中的调色板)
    initial_palette: Palette,
    /// 调色板自上次读取后是否变化
    dirty_palette: bool,
    /// 抖动目标调色板
    dither_palette: Option<Palette>,
    /// 画面宽度
    width: u32,
    /// 画面高度
    height: u32,
}

impl VideoTrack {
    /// 创建视频轨道并绑定编解码器
    pub fn new(
        header: StreamHeader,
        bitmap_info: BitmapInfoHeader,
        frame_count: u32,
        registry: Arc<CodecRegistry>,
    ) -> ReelResult<Self> {
        let codec = registry.create_video_codec(&bitmap_info.codec_params(header.handler))?;
        let initial_palette = bitmap_info.palette.clone().unwrap_or_default();
        let width = bitmap_info.width;
        let height = bitmap_info.height.unsigned_abs();
        Ok(Self {
            header,
            dirty_palette: bitmap_info.palette.is_some(),
            bitmap_info,
            registry,
            codec,
            frame_count,
            cur_frame: -1,
            surface: None,
            palette: initial_palette.clone(),
            initial_palette,
            dither_palette: None,
            width,
            height,
        })
    }

    /// 流头
    pub fn header(&self) -> &StreamHeader {
        &self.header
    }

    /// 位图信息头
    pub fn bitmap_info(&self) -> &BitmapInfoHeader {
        &self.bitmap_info
    }

    /// 编解码器名称
    pub fn codec_name(&self) -> &str {
        self.codec.name()
    }

    /// 帧率 (rate / scale)
    pub fn frame_rate(&self) -> Rational {
        self.header.unit_rate()
    }

    /// 总帧数
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// 当前帧号
    pub fn cur_frame(&self) -> i64 {
        self.cur_frame
    }

    /// 设置当前帧号 (调用方需已解码到该帧)
    pub fn set_cur_frame(&mut self, frame: i64) {
        self.cur_frame = frame;
    }

    /// 是否已到最后一帧
    pub fn end_of_track(&self) -> bool {
        self.cur_frame >= i64::from(self.frame_count) - 1
    }

    /// 把当前帧号强制设为最后一帧 (截断的文件)
    pub fn force_track_end(&mut self) {
        debug!(
            "视频在第 {} 帧提前结束, 强制跳到最后一帧 {}",
            self.cur_frame + 1,
            i64::from(self.frame_count) - 1
        );
        self.cur_frame = i64::from(self.frame_count) - 1;
    }

    /// 总时长
    pub fn duration(&self) -> Timestamp {
        Timestamp::from_frames(i64::from(self.frame_count), self.frame_rate())
    }

    /// 下一帧的开始时间
    pub fn next_frame_start_time(&self) -> Timestamp {
        Timestamp::from_frames(self.cur_frame + 1, self.frame_rate())
    }

    /// 宽度
    pub fn width(&self) -> u32 {
        self.width
    }

    /// 高度
    pub fn height(&self) -> u32 {
        self.height
    }

    /// 用解码出的画面尺寸覆盖容器中的尺寸
    pub fn force_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// 输出像素格式
    pub fn pixel_format(&self) -> PixelFormat {
        self.codec.pixel_format()
    }

    /// 是否为 Truemotion 1 (容器尺寸常常不可信)
    pub fn is_truemotion1(&self) -> bool {
        let c = &self.bitmap_info.compression;
        c.eq_ignore_ascii_case(b"DUCK") || self.header.handler.eq_ignore_ascii_case(b"DUCK")
    }

    /// 最近一帧画面
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    /// 解码一帧并前进帧号
    ///
    /// 空负载或解码失败时保留上一帧画面.
    pub fn decode_frame(&mut self, data: &[u8]) {
        if !data.is_empty() {
            match self.codec.decode_frame(data) {
                Ok(Some(surface)) => self.surface = Some(surface),
                Ok(None) => {}
                Err(e) => warn!("第 {} 帧解码失败: {}", self.cur_frame + 1, e),
            }
        }
        self.cur_frame += 1;
    }

    /// 应用调色板变更块
    ///
    /// 格式: 首项 (1 字节), 项数 (1 字节, 0 表示 256), 保留 2 字节, 随后 R G B 填充.
    /// 数据不足时只应用完整的项.
    pub fn apply_palette_change(&mut self, data: &[u8]) {
        if data.len() < 4 {
            debug!("调色板变更块过短 ({} 字节), 忽略", data.len());
            return;
        }
        let first = usize::from(data[0]);
        let count = if data[1] == 0 { 256 } else { usize::from(data[1]) };
        for (i, rgbx) in data[4..].chunks_exact(4).take(count).enumerate() {
            let Ok(index) = u8::try_from(first + i) else {
                break;
            };
            self.palette.set(index, [rgbx[0], rgbx[1], rgbx[2]]);
        }
        self.dirty_palette = true;
    }

    /// 重新安装初始调色板
    pub fn use_initial_palette(&mut self) {
        self.palette = self.initial_palette.clone();
        self.dirty_palette = true;
    }

    /// 调色板是否有变化
    pub fn has_dirty_palette(&self) -> bool {
        if self.codec.contains_palette() {
            self.codec.has_dirty_palette()
        } else {
            self.dirty_palette
        }
    }

    /// 读取调色板并清除变化标志
    pub fn palette(&mut self) -> &Palette {
        if self.codec.contains_palette() {
            self.codec.mark_palette_clean();
            if let Some(palette) = self.codec.palette() {
                return palette;
            }
        }
        self.dirty_palette = false;
        &self.palette
    }

    /// 只读查看调色板, 不清除变化标志
    pub fn peek_palette(&self) -> &Palette {
        if self.codec.contains_palette() {
            if let Some(palette) = self.codec.palette() {
                return palette;
            }
        }
        &self.palette
    }

    /// 编解码器是否支持抖动
    pub fn can_dither(&self) -> bool {
        self.codec.can_dither()
    }

    /// 设置抖动目标调色板, 回退重建编解码器后仍然生效
    pub fn set_dither(&mut self, palette: &Palette) {
        self.dither_palette = Some(palette.clone());
        self.codec.set_dither(palette);
    }

    /// 回到开头: 帧号归位、恢复初始调色板、重建编解码器、清空画面
    pub fn rewind(&mut self) -> ReelResult<()> {
        self.cur_frame = -1;
        self.use_initial_palette();
        self.codec = self
            .registry
            .create_video_codec(&self.bitmap_info.codec_params(self.header.handler))?;
        if let Some(palette) = &self.dither_palette {
            self.codec.set_dither(palette);
        }
        self.surface = None;
        Ok(())
    }
}

// ========================
// 音频轨道
// ========================

/// 音频轨道
pub struct AudioTrack {
    /// 流头
    header: StreamHeader,
    /// 波形格式
    wave_format: WaveFormat,
    /// 编解码器注册表, 重建音频流时使用
    registry: Arc<CodecRegistry>,
    /// 容器特定的解码器工厂
    factory: Option<AudioStreamFactory>,
    /// 混音器声音类型
    sound_type: SoundType,
    /// 已排入的块数
    cur_chunk: i64,
    /// 是否已没有更多数据
    end_of_data: bool,
    /// 包队列音频流
    packet_stream: PacketizedAudioStream,
}

impl AudioTrack {
    /// 创建音频轨道
    ///
    /// 格式不受支持时得到空流 (静音), 不会失败.
    pub fn new(
        header: StreamHeader,
        wave_format: WaveFormat,
        sound_type: SoundType,
        registry: Arc<CodecRegistry>,
        factory: Option<AudioStreamFactory>,
    ) -> Self {
        let packet_stream = create_packet_stream(&wave_format, &registry, factory);
        Self {
            header,
            wave_format,
            registry,
            factory,
            sound_type,
            cur_chunk: 0,
            end_of_data: false,
            packet_stream,
        }
    }

    /// 流头
    pub fn header(&self) -> &StreamHeader {
        &self.header
    }

    /// 波形格式
    pub fn wave_format(&self) -> &WaveFormat {
        &self.wave_format
    }

    /// 混音器声音类型
    pub fn sound_type(&self) -> SoundType {
        self.sound_type
    }

    /// 流自身的速率 (rate / scale)
    pub fn unit_rate(&self) -> Rational {
        self.header.unit_rate()
    }

    /// 已排入的块数
    pub fn cur_chunk(&self) -> i64 {
        self.cur_chunk
    }

    /// 设置块计数
    pub fn set_cur_chunk(&mut self, chunk: i64) {
        self.cur_chunk = chunk;
    }

    /// 是否已没有更多数据
    pub fn end_of_data(&self) -> bool {
        self.end_of_data
    }

    /// 声明没有更多数据
    pub fn finish(&mut self) {
        if !self.end_of_data {
            debug!("音频轨道共排入 {} 块, 数据结束", self.cur_chunk);
        }
        self.end_of_data = true;
        self.packet_stream.finish();
    }

    /// 是否为空流 (格式不受支持)
    pub fn is_null(&self) -> bool {
        self.packet_stream.is_null()
    }

    /// 排入一个压缩块并前进块计数
    pub fn queue_sound(&mut self, data: &[u8]) {
        if !data.is_empty() {
            self.packet_stream.queue_packet(data);
        }
        self.cur_chunk += 1;
    }

    /// 丢弃已排入的样本, 使播放从 `target` 开始
    ///
    /// `decoded` 为已排入数据的起始时刻; 二者之差换算为采样帧后乘以声道数.
    pub fn skip_audio(&mut self, target: Timestamp, decoded: Timestamp) {
        let rate = Rational::from_rate_scale(self.packet_stream.rate(), 1);
        let frames = target.frames_at(rate) - decoded.frames_at(rate);
        if frames <= 0 {
            return;
        }
        let mut remaining = frames as usize * usize::from(self.packet_stream.channels());
        let mut handle = self.packet_stream.handle();
        let mut scratch = [0i16; 4096];
        while remaining > 0 {
            let n = remaining.min(scratch.len());
            let read = handle.read_buffer(&mut scratch[..n]);
            if read == 0 {
                break;
            }
            remaining -= read;
        }
    }

    /// 销毁并重建音频流, 块计数归零
    pub fn reset_stream(&mut self) {
        self.packet_stream = create_packet_stream(&self.wave_format, &self.registry, self.factory);
        self.cur_chunk = 0;
        self.end_of_data = false;
    }

    /// 回到开头
    pub fn rewind(&mut self) {
        self.reset_stream();
    }

    /// 交给混音器的音频流
    pub fn audio_stream(&self) -> AudioStreamHandle {
        self.packet_stream.handle()
    }

    /// 已排入但尚未被混音器读取的时长 (毫秒)
    pub fn buffered_millis(&self) -> u64 {
        self.packet_stream.buffered_millis()
    }
}

/// 按格式标签选择包解码器, 失败时退化为空流
fn create_packet_stream(
    wave_format: &WaveFormat,
    registry: &CodecRegistry,
    factory: Option<AudioStreamFactory>,
) -> PacketizedAudioStream {
    let channels = wave_format.channels.max(1);
    let rate = wave_format.samples_per_sec;
    let params = wave_format.codec_params();

    let decoder = match factory.and_then(|f| f(wave_format)) {
        Some(result) => result,
        None if registry.has_audio_decoder(wave_format.tag) => {
            registry.create_audio_decoder(&params)
        }
        None => {
            match known_format_name(wave_format.tag) {
                Some(name) => warn!("音频格式 {name} 未内置解码器, 使用静音流"),
                None => warn!("不支持的音频格式 0x{:04X}, 使用静音流", wave_format.tag),
            }
            return PacketizedAudioStream::null(channels, rate);
        }
    };

    match decoder {
        Ok(decoder) => PacketizedAudioStream::new(decoder, channels, rate),
        Err(e) => {
            warn!(
                "创建音频解码器失败 (格式 0x{:04X}): {}, 使用静音流",
                wave_format.tag, e
            );
            PacketizedAudioStream::null(channels, rate)
        }
    }
}
