//! PCM 音频解码器.
//!
//! WAVE 中 16 位样本为有符号小端, 8 位样本为无符号; 统一输出为 16 位有符号.

use log::debug;
use reel_core::{ReelError, ReelResult};

use super::PacketDecoder;
use crate::codec_parameters::AudioCodecParams;

/// PCM 格式描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmDescriptor {
    /// 每样本位数 (8 或 16)
    pub bits: u16,
    /// 样本是否无符号
    pub unsigned: bool,
    /// 多字节样本是否小端
    pub little_endian: bool,
    /// 声道数
    pub channels: u16,
}

impl PcmDescriptor {
    /// 由 WAVEFORMATEX 推导 PCM 格式: 16 位为有符号小端, 8 位为无符号
    pub fn from_wave(params: &AudioCodecParams) -> ReelResult<Self> {
        match params.bits_per_sample {
            16 => Ok(Self {
                bits: 16,
                unsigned: false,
                little_endian: true,
                channels: params.channels,
            }),
            8 => Ok(Self {
                bits: 8,
                unsigned: true,
                little_endian: true,
                channels: params.channels,
            }),
            other => Err(ReelError::Unsupported(format!("PCM 不支持 {other} 位样本"))),
        }
    }

    /// 每样本字节数
    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits / 8)
    }

    /// 是否为立体声
    pub fn is_stereo(&self) -> bool {
        self.channels == 2
    }
}

/// PCM 解码器
pub struct PcmDecoder {
    desc: PcmDescriptor,
}

impl PcmDecoder {
    pub fn create(params: &AudioCodecParams) -> ReelResult<Box<dyn PacketDecoder>> {
        let desc = PcmDescriptor::from_wave(params)?;
        debug!(
            "打开 PCM 解码器: {} 位, {}, {} 声道",
            desc.bits,
            if desc.unsigned { "无符号" } else { "有符号" },
            desc.channels,
        );
        Ok(Box::new(Self { desc }))
    }

    /// 按描述直接创建
    pub fn with_descriptor(desc: PcmDescriptor) -> Self {
        Self { desc }
    }
}

impl PacketDecoder for PcmDecoder {
    fn name(&self) -> &str {
        "pcm"
    }

    fn decode(&mut self, data: &[u8], out: &mut Vec<i16>) -> ReelResult<()> {
        let desc = self.desc;
        match desc.bits {
            8 => out.extend(data.iter().map(|&b| {
                if desc.unsigned {
                    (i16::from(b) - 128) << 8
                } else {
                    i16::from(b as i8) << 8
                }
            })),
            16 => out.extend(data.chunks_exact(2).map(|c| {
                let v = if desc.little_endian {
                    u16::from_le_bytes([c[0], c[1]])
                } else {
                    u16::from_be_bytes([c[0], c[1]])
                };
                let v = if desc.unsigned { v ^ 0x8000 } else { v };
                v as i16
            })),
            other => {
                return Err(ReelError::Unsupported(format!("PCM 不支持 {other} 位样本")));
            }
        }
        Ok(())
    }
}
