//! Microsoft ADPCM 解码 (格式标签 2).
//!
//! 块头依次为各声道的系数索引、初始 delta、sample1、sample2,
//! 随后每字节两个 4 位码字 (高半字节在前).

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, warn};
use reel_core::{ReelError, ReelResult};

use super::PacketDecoder;
use crate::codec_parameters::AudioCodecParams;

/// delta 自适应表
const ADAPT_TABLE: [i32; 16] = [
    230, 230, 230, 230, 307, 409, 512, 614, 768, 614, 512, 409, 307, 230, 230, 230,
];

/// 默认预测系数对
const ADAPT_COEFFS: [[i32; 2]; 7] = [
    [256, 0],
    [512, -256],
    [0, 0],
    [192, 64],
    [240, 0],
    [460, -208],
    [392, -232],
];

/// 单声道预测器
#[derive(Debug, Clone, Copy, Default)]
struct Predictor {
    sample1: i32,
    sample2: i32,
    delta: i32,
    coef1: i32,
    coef2: i32,
}

impl Predictor {
    fn expand_nibble(&mut self, nibble: u8) -> i16 {
        let mul = if nibble & 8 == 0 {
            i32::from(nibble)
        } else {
            i32::from(nibble) - 16
        };
        let pred = self.calc_pred() + self.delta.wrapping_mul(mul);
        self.sample2 = self.sample1;
        self.sample1 = pred.clamp(-0x8000, 0x7FFF);
        self.delta = (ADAPT_TABLE[usize::from(nibble)].wrapping_mul(self.delta) >> 8).max(16);
        self.sample1 as i16
    }

    fn calc_pred(&self) -> i32 {
        self.sample1
            .wrapping_mul(self.coef1)
            .wrapping_add(self.sample2.wrapping_mul(self.coef2))
            >> 8
    }
}

/// Microsoft ADPCM 解码器
pub struct MsAdpcmDecoder {
    /// 声道数 (1 或 2)
    channels: usize,
    /// 每块字节数
    block_len: usize,
    /// 预测系数表
    coeffs: Vec<[i32; 2]>,
}

/// 从附加数据读取系数表: u16 每块样本数, u16 系数个数, 随后成对的 i16
fn read_coeffs(extra: &[u8]) -> ReelResult<Vec<[i32; 2]>> {
    let mut br = Cursor::new(extra);
    let _samples_per_block = br.read_u16::<LittleEndian>()?;
    let count = usize::from(br.read_u16::<LittleEndian>()?);
    if extra.len() < 4 + count * 4 || count == 0 {
        return Err(ReelError::InvalidData(format!(
            "MS ADPCM 系数表长度不符: {} 项, {} 字节",
            count,
            extra.len()
        )));
    }
    let mut coeffs = Vec::with_capacity(count);
    for _ in 0..count {
        let c1 = br.read_i16::<LittleEndian>()?;
        let c2 = br.read_i16::<LittleEndian>()?;
        coeffs.push([i32::from(c1), i32::from(c2)]);
    }
    Ok(coeffs)
}

impl MsAdpcmDecoder {
    pub fn create(params: &AudioCodecParams) -> ReelResult<Box<dyn PacketDecoder>> {
        let channels = usize::from(params.channels);
        if channels != 1 && channels != 2 {
            return Err(ReelError::Unsupported(format!(
                "MS ADPCM 不支持 {channels} 声道"
            )));
        }
        let block_len = usize::from(params.block_align);
        if block_len < 7 * channels + 1 {
            return Err(ReelError::InvalidArgument(format!(
                "MS ADPCM 块长度无效: {block_len}"
            )));
        }
        let coeffs = if params.extra_data.len() >= 4 {
            read_coeffs(&params.extra_data).unwrap_or_else(|e| {
                warn!("{e}, 使用默认系数表");
                ADAPT_COEFFS.to_vec()
            })
        } else {
            ADAPT_COEFFS.to_vec()
        };
        debug!(
            "打开 MS ADPCM 解码器: {} 声道, 块长度 {}, {} 组系数",
            channels,
            block_len,
            coeffs.len()
        );
        Ok(Box::new(Self {
            channels,
            block_len,
            coeffs,
        }))
    }

    fn decode_block(&self, block: &[u8], out: &mut Vec<i16>) -> ReelResult<()> {
        let channels = self.channels;
        let mut pred = [Predictor::default(); 2];
        let mut br = Cursor::new(block);
        for p in pred.iter_mut().take(channels) {
            let idx = usize::from(br.read_u8()?);
            let [c1, c2] = *self.coeffs.get(idx).ok_or_else(|| {
                ReelError::InvalidData(format!("MS ADPCM 系数索引越界: {idx}"))
            })?;
            p.coef1 = c1;
            p.coef2 = c2;
        }
        for p in pred.iter_mut().take(channels) {
            p.delta = i32::from(br.read_i16::<LittleEndian>()?);
        }
        for p in pred.iter_mut().take(channels) {
            p.sample1 = i32::from(br.read_i16::<LittleEndian>()?);
        }
        for p in pred.iter_mut().take(channels) {
            p.sample2 = i32::from(br.read_i16::<LittleEndian>()?);
        }
        // 头中的两个样本先输出 sample2, 再输出 sample1
        for p in pred.iter().take(channels) {
            out.push(p.sample2 as i16);
        }
        for p in pred.iter().take(channels) {
            out.push(p.sample1 as i16);
        }

        let body = &block[br.position() as usize..];
        for &b in body {
            if channels == 1 {
                out.push(pred[0].expand_nibble(b >> 4));
                out.push(pred[0].expand_nibble(b & 0xF));
            } else {
                out.push(pred[0].expand_nibble(b >> 4));
                out.push(pred[1].expand_nibble(b & 0xF));
            }
        }
        Ok(())
    }
}

impl PacketDecoder for MsAdpcmDecoder {
    fn name(&self) -> &str {
        "adpcm_ms"
    }

    fn decode(&mut self, data: &[u8], out: &mut Vec<i16>) -> ReelResult<()> {
        for block in data.chunks(self.block_len) {
            if block.len() < 7 * self.channels {
                break;
            }
            self.decode_block(block, out)?;
        }
        Ok(())
    }
}
