//! # reel-codec
//!
//! Reel 视频回放框架编解码器库, 提供画面/调色板抽象、视频编解码器接口与音频包流.
//!
//! ## 内置编解码器
//!
//! - **视频**: 未压缩位图 (BI_RGB, 8/16/24/32 位)
//! - **音频**: PCM (U8/S16LE), MS ADPCM, IMA ADPCM (Microsoft), Duck DK3 ADPCM
//!
//! 其他视频 fourcc 通过 [`CodecRegistry::register_video_codec`] 接入.
//!
//! ## 使用示例
//!
//! ```rust
//! use reel_codec::CodecRegistry;
//!
//! let mut reg = CodecRegistry::new();
//! reel_codec::register_all(&mut reg);
//! assert!(reg.has_audio_decoder(reel_codec::audio::format_tag::PCM));
//! ```

pub mod audio;
pub mod codec_parameters;
pub mod codecs;
pub mod palette;
pub mod registry;
pub mod surface;
pub mod video_codec;

// 重导出常用类型
pub use audio::{AudioStream, AudioStreamHandle, PacketDecoder, PacketizedAudioStream};
pub use codec_parameters::{AudioCodecParams, VideoCodecParams};
pub use palette::Palette;
pub use registry::CodecRegistry;
pub use surface::Surface;
pub use video_codec::VideoCodec;

/// 注册所有内置编解码器
pub fn register_all(registry: &mut CodecRegistry) {
    codecs::register_all_video_codecs(registry);
    audio::register_all_audio_decoders(registry);
}

/// 将 fourcc 转为可读字符串, 不可打印字节以 '.' 表示
pub fn fourcc_to_string(tag: &[u8; 4]) -> String {
    tag.iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}
