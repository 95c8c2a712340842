//! 编解码器注册表.
//!
//! 视频编解码器按压缩 fourcc (不区分大小写) 注册, 音频解码器按 WAVE 格式标签注册.
//! 同一键注册多个工厂时使用第一个注册的 (优先级最高), 因此嵌入方可以在
//! [`crate::register_all`] 之前注册自己的实现来覆盖内置解码器.

use std::collections::HashMap;

use log::debug;
use reel_core::{ReelError, ReelResult};

use crate::audio::PacketDecoder;
use crate::codec_parameters::{AudioCodecParams, VideoCodecParams};
use crate::fourcc_to_string;
use crate::video_codec::VideoCodec;

/// 视频编解码器工厂函数类型
pub type VideoCodecFactory = fn(&VideoCodecParams) -> ReelResult<Box<dyn VideoCodec>>;

/// 音频包解码器工厂函数类型
pub type AudioDecoderFactory = fn(&AudioCodecParams) -> ReelResult<Box<dyn PacketDecoder>>;

/// 编解码器注册表
pub struct CodecRegistry {
    /// 视频编解码器工厂映射 (键为大写 fourcc)
    video: HashMap<[u8; 4], Vec<Entry<VideoCodecFactory>>>,
    /// 音频解码器工厂映射
    audio: HashMap<u16, Vec<Entry<AudioDecoderFactory>>>,
}

/// 注册条目
struct Entry<F> {
    /// 名称
    name: String,
    /// 工厂函数
    factory: F,
}

/// fourcc 统一转为大写, 使 `cvid` 与 `CVID` 命中同一项
fn normalize_fourcc(tag: [u8; 4]) -> [u8; 4] {
    tag.map(|b| b.to_ascii_uppercase())
}

impl CodecRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            video: HashMap::new(),
            audio: HashMap::new(),
        }
    }

    /// 注册一个视频编解码器
    pub fn register_video_codec(
        &mut self,
        fourcc: [u8; 4],
        name: impl Into<String>,
        factory: VideoCodecFactory,
    ) {
        self.video
            .entry(normalize_fourcc(fourcc))
            .or_default()
            .push(Entry {
                name: name.into(),
                factory,
            });
    }

    /// 注册一个音频包解码器
    pub fn register_audio_decoder(
        &mut self,
        format_tag: u16,
        name: impl Into<String>,
        factory: AudioDecoderFactory,
    ) {
        self.audio.entry(format_tag).or_default().push(Entry {
            name: name.into(),
            factory,
        });
    }

    /// 按 BITMAPINFOHEADER 参数创建视频编解码器
    pub fn create_video_codec(&self, params: &VideoCodecParams) -> ReelResult<Box<dyn VideoCodec>> {
        let entry = self
            .video
            .get(&normalize_fourcc(params.fourcc))
            .and_then(|entries| entries.first())
            .ok_or_else(|| {
                ReelError::CodecNotFound(format!(
                    "视频 fourcc '{}'",
                    fourcc_to_string(&params.fourcc)
                ))
            })?;
        debug!(
            "创建视频编解码器: {} ({}x{}, {} bpp)",
            entry.name, params.width, params.height, params.bit_count
        );
        (entry.factory)(params)
    }

    /// 按 WAVEFORMATEX 参数创建音频包解码器
    pub fn create_audio_decoder(
        &self,
        params: &AudioCodecParams,
    ) -> ReelResult<Box<dyn PacketDecoder>> {
        let entry = self
            .audio
            .get(&params.format_tag)
            .and_then(|entries| entries.first())
            .ok_or_else(|| {
                ReelError::CodecNotFound(format!("音频格式标签 0x{:04X}", params.format_tag))
            })?;
        debug!(
            "创建音频解码器: {} ({} Hz, {} 声道)",
            entry.name, params.sample_rate, params.channels
        );
        (entry.factory)(params)
    }

    /// 指定 fourcc 是否有已注册的视频编解码器
    pub fn has_video_codec(&self, fourcc: [u8; 4]) -> bool {
        self.video.contains_key(&normalize_fourcc(fourcc))
    }

    /// 指定格式标签是否有已注册的音频解码器
    pub fn has_audio_decoder(&self, format_tag: u16) -> bool {
        self.audio.contains_key(&format_tag)
    }

    /// 获取所有已注册的视频编解码器名称
    pub fn list_video_codecs(&self) -> Vec<(String, &str)> {
        let mut result = Vec::new();
        for (tag, entries) in &self.video {
            for entry in entries {
                result.push((fourcc_to_string(tag), entry.name.as_str()));
            }
        }
        result
    }

    /// 获取所有已注册的音频解码器名称
    pub fn list_audio_decoders(&self) -> Vec<(u16, &str)> {
        let mut result = Vec::new();
        for (tag, entries) in &self.audio {
            for entry in entries {
                result.push((*tag, entry.name.as_str()));
            }
        }
        result
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}
