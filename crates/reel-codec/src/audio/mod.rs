//! 音频流与包解码器.
//!
//! 容器按块把压缩音频送入 [`PacketizedAudioStream`], 包解码器立即把它展开为
//! 交错的 16 位样本并排入共享队列; 混音器通过 [`AudioStreamHandle`] 拉取样本.

pub mod dk3;
pub mod imaadpcm;
pub mod msadpcm;
pub mod pcm;
pub mod queue;

use reel_core::ReelResult;

pub use queue::{AudioStreamHandle, PacketizedAudioStream};

use crate::registry::CodecRegistry;

/// WAVE 格式标签
pub mod format_tag {
    /// 线性 PCM
    pub const PCM: u16 = 1;
    /// Microsoft ADPCM
    pub const MS_ADPCM: u16 = 2;
    /// Microsoft IMA ADPCM
    pub const MS_IMA_ADPCM: u16 = 17;
    /// MPEG Layer 3
    pub const MP3: u16 = 85;
    /// Duck DK3 IMA ADPCM
    pub const DK3: u16 = 98;
    /// Vorbis ('V' << 8 | 'o')
    pub const VORBIS: u16 = ((b'V' as u16) << 8) | b'o' as u16;
}

/// 可被混音器拉取的音频流
pub trait AudioStream: Send {
    /// 读取交错样本到 `buffer`, 返回实际读取的样本数 (不足部分由混音器补静音)
    fn read_buffer(&mut self, buffer: &mut [i16]) -> usize;

    /// 声道数
    fn channels(&self) -> u16;

    /// 是否为立体声
    fn is_stereo(&self) -> bool {
        self.channels() == 2
    }

    /// 采样率 (Hz)
    fn rate(&self) -> u32;

    /// 当前是否没有可读样本 (之后仍可能有新数据排入)
    fn end_of_data(&self) -> bool;

    /// 数据已全部读完且不会再有新数据
    fn end_of_stream(&self) -> bool;
}

/// 音频包解码器
///
/// 每次调用处理容器中的一个完整音频块, 输出交错的 16 位样本.
pub trait PacketDecoder: Send {
    /// 解码器名称
    fn name(&self) -> &str;

    /// 解码一个数据包, 样本追加到 `out`
    fn decode(&mut self, data: &[u8], out: &mut Vec<i16>) -> ReelResult<()>;
}

/// 注册所有内置音频解码器
pub fn register_all_audio_decoders(registry: &mut CodecRegistry) {
    registry.register_audio_decoder(format_tag::PCM, "pcm", pcm::PcmDecoder::create);
    registry.register_audio_decoder(
        format_tag::MS_ADPCM,
        "adpcm_ms",
        msadpcm::MsAdpcmDecoder::create,
    );
    registry.register_audio_decoder(
        format_tag::MS_IMA_ADPCM,
        "adpcm_ima_ms",
        imaadpcm::ImaAdpcmDecoder::create,
    );
    registry.register_audio_decoder(format_tag::DK3, "adpcm_dk3", dk3::Dk3AdpcmDecoder::create);
}

/// 已知但未内置解码器的格式名称
pub fn known_format_name(format_tag: u16) -> Option<&'static str> {
    match format_tag {
        format_tag::MP3 => Some("MPEG Layer 3"),
        format_tag::VORBIS => Some("Vorbis"),
        _ => None,
    }
}
