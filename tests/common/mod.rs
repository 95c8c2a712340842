//! 集成测试共用的辅助工具.
//!
//! - [`AviBuilder`]: 在内存中构造 AVI 文件
//! - [`DeltaCodec`]: 以 "cvid" 注册的差分测试编解码器, 画面内容可推出解码历史
//! - [`RecordingMixer`]: 记录绑定事件的混音器

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use reel::codec::{
    AudioStream, AudioStreamHandle, CodecRegistry, Surface, VideoCodec, VideoCodecParams,
};
use reel::core::{PixelFormat, ReelResult};
use reel::format::{
    IoContext, ManualClock, Mixer, SoundHandle, SoundType, VideoDecoder, VideoDecoderConfig,
};

// ============================================================
// 测试编解码器
// ============================================================

/// 差分测试编解码器
///
/// 负载 `['K', v]` 把状态设为 `v`, `['P', d]` 把状态加上 `d`; 输出画面全部填充状态值.
/// 因此某帧的画面值只有在从最近关键帧起依次解码时才正确.
pub struct DeltaCodec {
    width: u32,
    height: u32,
    state: u8,
}

impl DeltaCodec {
    pub fn create(params: &VideoCodecParams) -> ReelResult<Box<dyn VideoCodec>> {
        Ok(Box::new(Self {
            width: params.width,
            height: params.abs_height(),
            state: 0,
        }))
    }
}

impl VideoCodec for DeltaCodec {
    fn name(&self) -> &str {
        "delta"
    }

    fn decode_frame(&mut self, data: &[u8]) -> ReelResult<Option<Surface>> {
        match data {
            [b'K', v, ..] => self.state = *v,
            [b'P', d, ..] => self.state = self.state.wrapping_add(*d),
            _ => return Ok(None),
        }
        let mut surface = Surface::new(self.width, self.height, PixelFormat::Pal8);
        surface.data.fill(self.state);
        Ok(Some(surface))
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Pal8
    }
}

/// 内置编解码器加上 "cvid" 差分编解码器
pub fn registry() -> Arc<CodecRegistry> {
    let mut registry = CodecRegistry::new();
    reel::codec::register_all(&mut registry);
    registry.register_video_codec(*b"cvid", "delta", DeltaCodec::create);
    Arc::new(registry)
}

/// 初始化测试日志 (重复调用无副作用)
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================
// 混音器
// ============================================================

/// 混音器事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixerEvent {
    Play(SoundHandle, SoundType),
    Stop(SoundHandle),
    Pause(SoundHandle, bool),
}

/// 记录事件并保留音频流的混音器, 克隆体共享记录
#[derive(Clone, Default)]
pub struct RecordingMixer {
    events: Arc<Mutex<Vec<MixerEvent>>>,
    streams: Arc<Mutex<Vec<(SoundHandle, AudioStreamHandle)>>>,
    next_handle: Arc<AtomicU32>,
}

impl RecordingMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部事件
    pub fn events(&self) -> Vec<MixerEvent> {
        self.events.lock().unwrap().clone()
    }

    /// 清空事件记录
    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }

    /// 当前仍在播放 (未停止) 的句柄
    pub fn active_handles(&self) -> Vec<SoundHandle> {
        self.streams
            .lock()
            .unwrap()
            .iter()
            .map(|(handle, _)| *handle)
            .collect()
    }

    /// 从某个句柄的音频流读取最多 `count` 个样本
    pub fn read_samples(&self, handle: SoundHandle, count: usize) -> Vec<i16> {
        let mut streams = self.streams.lock().unwrap();
        let Some((_, stream)) = streams.iter_mut().find(|(h, _)| *h == handle) else {
            return Vec::new();
        };
        let mut buf = vec![0i16; count];
        let n = stream.read_buffer(&mut buf);
        buf.truncate(n);
        buf
    }
}

impl Mixer for RecordingMixer {
    fn play_stream(&mut self, sound_type: SoundType, stream: AudioStreamHandle) -> SoundHandle {
        let handle = SoundHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.streams.lock().unwrap().push((handle, stream));
        self.events
            .lock()
            .unwrap()
            .push(MixerEvent::Play(handle, sound_type));
        handle
    }

    fn stop_handle(&mut self, handle: SoundHandle) {
        self.streams.lock().unwrap().retain(|(h, _)| *h != handle);
        self.events.lock().unwrap().push(MixerEvent::Stop(handle));
    }

    fn pause_handle(&mut self, handle: SoundHandle, paused: bool) {
        self.events
            .lock()
            .unwrap()
            .push(MixerEvent::Pause(handle, paused));
    }
}

// ============================================================
// 调度器
// ============================================================

/// 以手动时钟与记录混音器创建调度器并加载 `data`
pub fn open(
    data: Vec<u8>,
    config: &VideoDecoderConfig,
) -> (VideoDecoder, ManualClock, RecordingMixer) {
    init_logger();
    let clock = ManualClock::new();
    let mixer = RecordingMixer::new();
    let mut decoder = VideoDecoder::avi(
        config,
        registry(),
        Box::new(clock.clone()),
        Box::new(mixer.clone()),
    );
    decoder
        .load(IoContext::from_memory(data))
        .expect("加载 AVI 失败");
    (decoder, clock, mixer)
}

/// 画面首字节 (差分编解码器的状态值)
pub fn surface_value(surface: &Surface) -> u8 {
    surface.data[0]
}

// ============================================================
// AVI 构造器
// ============================================================

/// 索引写法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// 偏移相对 'movi' 标签位置
    Relative,
    /// 偏移为文件绝对位置
    Absolute,
    /// 不写 idx1
    None,
}

/// PCM 音频流描述
#[derive(Debug, Clone, Copy)]
struct PcmFormat {
    channels: u16,
    sample_rate: u32,
    bits: u16,
    key_flags: bool,
}

/// 内存 AVI 构造器
///
/// 视频为流 0 ("cvid", 8 位调色板), 第 i 帧的负载为关键帧 `['K', i]` 或差分帧 `['P', 1]`.
/// 可选的 PCM 音频为流 1, 每个视频帧之后放一个音频块, 时长为一帧;
/// 音频块中每个样本的值都等于块序号.
pub struct AviBuilder {
    width: u32,
    height: u32,
    rate: u32,
    scale: u32,
    frames: usize,
    declared_frames: Option<u32>,
    keyframes: Option<Vec<usize>>,
    palette: Vec<[u8; 3]>,
    palette_changes: Vec<(usize, u8, Vec<[u8; 3]>)>,
    audio: Option<PcmFormat>,
    index: IndexMode,
}

impl AviBuilder {
    /// `frames` 帧, 10 fps, 4x2, 全部为关键帧, 相对偏移索引
    pub fn new(frames: usize) -> Self {
        Self {
            width: 4,
            height: 2,
            rate: 10,
            scale: 1,
            frames,
            declared_frames: None,
            keyframes: None,
            palette: (0..16u8).map(|i| [i, i * 2, i * 3]).collect(),
            palette_changes: Vec::new(),
            audio: None,
            index: IndexMode::Relative,
        }
    }

    pub fn frame_rate(mut self, rate: u32, scale: u32) -> Self {
        self.rate = rate;
        self.scale = scale;
        self
    }

    /// 只把这些帧标为关键帧
    pub fn keyframes(mut self, keyframes: &[usize]) -> Self {
        self.keyframes = Some(keyframes.to_vec());
        self
    }

    /// 头部声明的帧数 (大于实际写入帧数时模拟截断文件)
    pub fn declared_frames(mut self, frames: u32) -> Self {
        self.declared_frames = Some(frames);
        self
    }

    /// 在第 `frame` 帧之前插入调色板变更块
    pub fn palette_change(mut self, frame: usize, first: u8, entries: &[[u8; 3]]) -> Self {
        self.palette_changes.push((frame, first, entries.to_vec()));
        self
    }

    /// 添加 PCM 音频流; `key_flags` 为 false 时音频索引条目不带关键帧标志
    pub fn pcm_audio(
        mut self,
        channels: u16,
        sample_rate: u32,
        bits: u16,
        key_flags: bool,
    ) -> Self {
        self.audio = Some(PcmFormat {
            channels,
            sample_rate,
            bits,
            key_flags,
        });
        self
    }

    pub fn index(mut self, mode: IndexMode) -> Self {
        self.index = mode;
        self
    }

    /// 是否为关键帧
    pub fn is_keyframe(&self, frame: usize) -> bool {
        self.keyframes
            .as_ref()
            .is_none_or(|keys| keys.contains(&frame))
    }

    fn frame_payload(&self, frame: usize) -> Vec<u8> {
        if self.is_keyframe(frame) {
            vec![b'K', frame as u8]
        } else {
            vec![b'P', 1]
        }
    }

    /// 每个音频块的采样帧数 (一帧视频的时长)
    pub fn audio_frames_per_chunk(&self) -> u32 {
        self.audio
            .map_or(0, |a| a.sample_rate * self.scale / self.rate)
    }

    fn audio_payload(&self, format: &PcmFormat, chunk: usize) -> Vec<u8> {
        let samples = self.audio_frames_per_chunk() as usize * usize::from(format.channels);
        let mut out = Vec::with_capacity(samples * 2);
        for _ in 0..samples {
            if format.bits == 16 {
                out.extend_from_slice(&(chunk as i16).to_le_bytes());
            } else {
                out.push(128u8.wrapping_add(chunk as u8));
            }
        }
        out
    }

    pub fn build(&self) -> Vec<u8> {
        let declared = self.declared_frames.unwrap_or(self.frames as u32);
        let stream_count = 1 + u32::from(self.audio.is_some());

        // hdrl
        let mut avih = Vec::new();
        let usec = (1_000_000u64 * u64::from(self.scale) / u64::from(self.rate.max(1))) as u32;
        avih.extend_from_slice(&usec.to_le_bytes());
        avih.extend_from_slice(&0u32.to_le_bytes()); // max_bytes_per_sec
        avih.extend_from_slice(&0u32.to_le_bytes()); // padding
        let flags: u32 = if self.index == IndexMode::None { 0 } else { 0x10 };
        avih.extend_from_slice(&flags.to_le_bytes());
        avih.extend_from_slice(&declared.to_le_bytes());
        avih.extend_from_slice(&0u32.to_le_bytes()); // initial_frames
        avih.extend_from_slice(&stream_count.to_le_bytes());
        avih.extend_from_slice(&0u32.to_le_bytes()); // buffer_size
        avih.extend_from_slice(&self.width.to_le_bytes());
        avih.extend_from_slice(&self.height.to_le_bytes());
        avih.extend_from_slice(&[0; 16]);

        let mut hdrl = Vec::new();
        riff_chunk(&mut hdrl, b"avih", &avih);

        let mut vstrl = Vec::new();
        riff_chunk(
            &mut vstrl,
            b"strh",
            &strh(b"vids", b"cvid", self.rate, self.scale, declared, 0),
        );
        riff_chunk(&mut vstrl, b"strf", &self.bitmap_strf());
        hdrl.extend(list(b"strl", &vstrl));

        if let Some(format) = &self.audio {
            let block_align = format.channels * format.bits / 8;
            let avg_bytes = format.sample_rate * u32::from(block_align);
            let length = self.audio_frames_per_chunk() * self.frames as u32;
            let mut astrl = Vec::new();
            riff_chunk(
                &mut astrl,
                b"strh",
                &strh(
                    b"auds",
                    &[0; 4],
                    avg_bytes,
                    u32::from(block_align),
                    length,
                    u32::from(block_align),
                ),
            );
            let mut wave = Vec::new();
            wave.extend_from_slice(&1u16.to_le_bytes());
            wave.extend_from_slice(&format.channels.to_le_bytes());
            wave.extend_from_slice(&format.sample_rate.to_le_bytes());
            wave.extend_from_slice(&avg_bytes.to_le_bytes());
            wave.extend_from_slice(&block_align.to_le_bytes());
            wave.extend_from_slice(&format.bits.to_le_bytes());
            wave.extend_from_slice(&0u16.to_le_bytes());
            riff_chunk(&mut astrl, b"strf", &wave);
            hdrl.extend(list(b"strl", &astrl));
        }

        // movi
        let mut movi_body = Vec::new();
        let mut entries: Vec<([u8; 4], u32, usize, usize)> = Vec::new();
        let mut push = |body: &mut Vec<u8>, tag: &[u8; 4], data: &[u8], flags: u32| {
            entries.push((*tag, flags, body.len(), data.len()));
            riff_chunk(body, tag, data);
        };
        for frame in 0..self.frames {
            for (_, first, colors) in self.palette_changes.iter().filter(|(f, _, _)| *f == frame) {
                let mut data = vec![*first, colors.len() as u8, 0, 0];
                for rgb in colors {
                    data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 0]);
                }
                push(&mut movi_body, b"00pc", &data, 0);
            }
            let flags = if self.is_keyframe(frame) { 0x10 } else { 0 };
            push(&mut movi_body, b"00dc", &self.frame_payload(frame), flags);
            if let Some(format) = &self.audio {
                let flags = if format.key_flags { 0x10 } else { 0 };
                push(&mut movi_body, b"01wb", &self.audio_payload(format, frame), flags);
            }
        }

        let mut body = Vec::new();
        body.extend_from_slice(b"AVI ");
        body.extend(list(b"hdrl", &hdrl));
        // 'RIFF' + 大小 + body ('AVI ' 已计入) + 'LIST' + 大小 + 'movi'
        let movi_start = 8 + body.len() + 12;
        body.extend(list(b"movi", &movi_body));

        if self.index != IndexMode::None {
            let mut idx = Vec::new();
            for (tag, flags, pos, size) in &entries {
                let offset = match self.index {
                    IndexMode::Absolute => movi_start + pos,
                    _ => pos + 4,
                };
                idx.extend_from_slice(tag);
                idx.extend_from_slice(&flags.to_le_bytes());
                idx.extend_from_slice(&(offset as u32).to_le_bytes());
                idx.extend_from_slice(&(*size as u32).to_le_bytes());
            }
            riff_chunk(&mut body, b"idx1", &idx);
        }

        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend(body);
        out
    }

    fn bitmap_strf(&self) -> Vec<u8> {
        let mut d = Vec::new();
        d.extend_from_slice(&40u32.to_le_bytes());
        d.extend_from_slice(&self.width.to_le_bytes());
        d.extend_from_slice(&(self.height as i32).to_le_bytes());
        d.extend_from_slice(&1u16.to_le_bytes());
        d.extend_from_slice(&8u16.to_le_bytes());
        d.extend_from_slice(b"cvid");
        d.extend_from_slice(&[0; 12]); // size_image, x/y 分辨率
        d.extend_from_slice(&(self.palette.len() as u32).to_le_bytes());
        d.extend_from_slice(&0u32.to_le_bytes());
        for rgb in &self.palette {
            d.extend_from_slice(&[rgb[2], rgb[1], rgb[0], 0]);
        }
        d
    }
}

fn riff_chunk(out: &mut Vec<u8>, tag: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(tag);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    if data.len() % 2 == 1 {
        out.push(0);
    }
}

fn list(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"LIST");
    out.extend_from_slice(&(body.len() as u32 + 4).to_le_bytes());
    out.extend_from_slice(tag);
    out.extend_from_slice(body);
    out
}

fn strh(
    kind: &[u8; 4],
    handler: &[u8; 4],
    rate: u32,
    scale: u32,
    length: u32,
    sample_size: u32,
) -> Vec<u8> {
    let mut d = Vec::new();
    d.extend_from_slice(kind);
    d.extend_from_slice(handler);
    d.extend_from_slice(&[0; 12]); // flags, priority, language, initial_frames
    d.extend_from_slice(&scale.to_le_bytes());
    d.extend_from_slice(&rate.to_le_bytes());
    d.extend_from_slice(&0u32.to_le_bytes()); // start
    d.extend_from_slice(&length.to_le_bytes());
    d.extend_from_slice(&0u32.to_le_bytes()); // buffer_size
    d.extend_from_slice(&u32::MAX.to_le_bytes()); // quality
    d.extend_from_slice(&sample_size.to_le_bytes());
    d.extend_from_slice(&[0; 8]); // rect
    d
}
