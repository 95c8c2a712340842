//! IMA ADPCM 解码 (Microsoft WAVE 变体, 格式标签 17).
//!
//! 每块开头为各声道 4 字节头 (预测值 i16, 步长索引 u8, 保留 1 字节),
//! 随后各声道轮流提供 32 位字, 每字展开为 8 个样本 (低半字节在前).

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use reel_core::{ReelError, ReelResult};

use super::PacketDecoder;
use crate::codec_parameters::AudioCodecParams;

/// 步长索引增量表
pub const IMA_STEPS: [i8; 16] = [-1, -1, -1, -1, 2, 4, 6, 8, -1, -1, -1, -1, 2, 4, 6, 8];

/// 步长表
pub const IMA_STEP_TABLE: [i32; 89] = [
    7, 8, 9, 10, 11, 12, 13, 14, 16, 17, 19, 21, 23, 25, 28, 31, 34, 37, 41, 45, 50, 55, 60, 66,
    73, 80, 88, 97, 107, 118, 130, 143, 157, 173, 190, 209, 230, 253, 279, 307, 337, 371, 408,
    449, 494, 544, 598, 658, 724, 796, 876, 963, 1060, 1166, 1282, 1411, 1552, 1707, 1878, 2066,
    2272, 2499, 2749, 3024, 3327, 3660, 4026, 4428, 4871, 5358, 5894, 6484, 7132, 7845, 8630,
    9493, 10442, 11487, 12635, 13899, 15289, 16818, 18500, 20350, 22385, 24623, 27086, 29794,
    32767,
];

/// 最大步长索引
pub const IMA_MAX_STEP: u8 = 88;

/// 单声道 IMA 预测器状态
#[derive(Debug, Clone, Copy, Default)]
pub struct ImaState {
    /// 当前预测值
    pub predictor: i32,
    /// 当前步长索引
    pub step: usize,
}

impl ImaState {
    /// 以块头中的预测值与步长索引重新初始化
    pub fn reset(&mut self, predictor: i16, step: u8) {
        self.predictor = i32::from(predictor);
        self.step = usize::from(step.min(IMA_MAX_STEP));
    }

    /// 展开一个 4 位码字
    pub fn expand_sample(&mut self, nibble: u8) -> i16 {
        let nibble = nibble & 0xF;
        let istep = self.step as isize + IMA_STEPS[usize::from(nibble)] as isize;
        let diff = (i32::from(2 * (nibble & 7) + 1) * IMA_STEP_TABLE[self.step]) >> 3;
        let sample = if nibble & 8 == 0 {
            self.predictor + diff
        } else {
            self.predictor - diff
        };
        self.predictor = sample.clamp(i32::from(i16::MIN), i32::from(i16::MAX));
        self.step = istep.clamp(0, IMA_MAX_STEP as isize) as usize;
        self.predictor as i16
    }
}

/// Microsoft IMA ADPCM 解码器
pub struct ImaAdpcmDecoder {
    /// 声道数 (1 或 2)
    channels: usize,
    /// 每块字节数
    block_len: usize,
    /// 各声道预测器
    state: [ImaState; 2],
}

impl ImaAdpcmDecoder {
    pub fn create(params: &AudioCodecParams) -> ReelResult<Box<dyn PacketDecoder>> {
        let channels = usize::from(params.channels);
        if channels != 1 && channels != 2 {
            return Err(ReelError::Unsupported(format!(
                "IMA ADPCM 不支持 {channels} 声道"
            )));
        }
        let block_len = usize::from(params.block_align);
        if block_len < 8 * channels || block_len & 3 != 0 {
            return Err(ReelError::InvalidArgument(format!(
                "IMA ADPCM 块长度无效: {block_len}"
            )));
        }
        debug!("打开 IMA ADPCM 解码器: {channels} 声道, 块长度 {block_len}");
        Ok(Box::new(Self {
            channels,
            block_len,
            state: [ImaState::default(); 2],
        }))
    }

    fn decode_block(&mut self, block: &[u8], out: &mut Vec<i16>) -> ReelResult<()> {
        let channels = self.channels;
        let mut br = Cursor::new(block);
        for ch in 0..channels {
            let pred = br.read_i16::<LittleEndian>()?;
            let step = br.read_u8()?;
            br.read_u8()?;
            if step > IMA_MAX_STEP {
                return Err(ReelError::InvalidData(format!("IMA 步长索引越界: {step}")));
            }
            self.state[ch].reset(pred, step);
            out.push(pred);
        }

        // 每轮每个声道 4 字节, 得到 8 个采样帧
        let mut group = [[0i16; 8]; 2];
        while block.len() - br.position() as usize >= 4 * channels {
            for (ch, samples) in group.iter_mut().enumerate().take(channels) {
                let mut cw = br.read_u32::<LittleEndian>()?;
                for s in samples.iter_mut() {
                    *s = self.state[ch].expand_sample((cw & 0xF) as u8);
                    cw >>= 4;
                }
            }
            for i in 0..8 {
                for samples in group.iter().take(channels) {
                    out.push(samples[i]);
                }
            }
        }
        Ok(())
    }
}

impl PacketDecoder for ImaAdpcmDecoder {
    fn name(&self) -> &str {
        "adpcm_ima_ms"
    }

    fn decode(&mut self, data: &[u8], out: &mut Vec<i16>) -> ReelResult<()> {
        for block in data.chunks(self.block_len) {
            if block.len() < 4 * self.channels {
                break;
            }
            self.decode_block(block, out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn params(channels: u16, block_align: u16) -> AudioCodecParams {
        AudioCodecParams {
            format_tag: super::super::format_tag::MS_IMA_ADPCM,
            channels,
            sample_rate: 22050,
            avg_bytes_per_sec: 11100,
            block_align,
            bits_per_sample: 4,
            extra_data: Bytes::new(),
        }
    }

    #[test]
    fn test_ima_展开半字节() {
        let mut st = ImaState::default();
        st.reset(0, 0);
        // 步长 7: diff = (2*7+1)*7 >> 3 = 13
        assert_eq!(st.expand_sample(0x7), 13);
        assert_eq!(st.step, 8);
        // 负号
        let mut st = ImaState::default();
        st.reset(100, 0);
        assert_eq!(st.expand_sample(0x8), 100 - (7 >> 3));
        assert_eq!(st.step, 0);
    }

    #[test]
    fn test_ima_预测值饱和() {
        let mut st = ImaState::default();
        st.reset(i16::MAX, IMA_MAX_STEP);
        assert_eq!(st.expand_sample(0x7), i16::MAX);
        assert_eq!(st.step, usize::from(IMA_MAX_STEP));
    }

    #[test]
    fn test_ima_单声道块样本数() {
        let mut dec = ImaAdpcmDecoder::create(&params(1, 12)).unwrap();
        let block = [0x10, 0x00, 0x00, 0x00, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut out = Vec::new();
        dec.decode(&block, &mut out).unwrap();
        // 头样本 1 个 + 2 个 32 位字各 8 个
        assert_eq!(out.len(), 17);
        assert_eq!(out[0], 0x10);
    }

    #[test]
    fn test_ima_立体声交错() {
        let mut dec = ImaAdpcmDecoder::create(&params(2, 16)).unwrap();
        let mut block = vec![0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00];
        block.extend_from_slice(&[0; 8]);
        let mut out = Vec::new();
        dec.decode(&block, &mut out).unwrap();
        assert_eq!(out.len(), 18);
        assert_eq!(&out[..2], &[1, 2]);
    }

    #[test]
    fn test_ima_拒绝无效块长度() {
        assert!(ImaAdpcmDecoder::create(&params(2, 10)).is_err());
        assert!(ImaAdpcmDecoder::create(&params(3, 64)).is_err());
    }
}
