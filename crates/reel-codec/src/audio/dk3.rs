//! Duck DK3 IMA ADPCM 解码 (格式标签 98).
//!
//! 仅支持立体声: 一个"和"通道与一个"差"通道各自按 IMA 展开,
//! 每 3 个半字节重建出 2 个立体声采样帧.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use reel_core::{ReelError, ReelResult};

use super::PacketDecoder;
use super::imaadpcm::{IMA_MAX_STEP, ImaState};
use crate::codec_parameters::AudioCodecParams;

/// 块头长度
const DK3_HEADER_LEN: usize = 16;

/// DK3 ADPCM 解码器
pub struct Dk3AdpcmDecoder {
    /// 每块字节数
    block_len: usize,
    /// 每块每声道输出的样本数
    out_block_len: usize,
    /// 和通道与差通道预测器
    state: [ImaState; 2],
}

impl Dk3AdpcmDecoder {
    pub fn create(params: &AudioCodecParams) -> ReelResult<Box<dyn PacketDecoder>> {
        if params.channels != 2 {
            return Err(ReelError::Unsupported(format!(
                "DK3 ADPCM 仅支持立体声, 实际 {} 声道",
                params.channels
            )));
        }
        let block_len = usize::from(params.block_align);
        if block_len <= DK3_HEADER_LEN {
            return Err(ReelError::InvalidArgument(format!(
                "DK3 ADPCM 块长度无效: {block_len}"
            )));
        }
        let out_block_len = ((block_len - DK3_HEADER_LEN) * 2 / 3) * 2;
        debug!("打开 DK3 ADPCM 解码器: 块长度 {block_len}, 每块 {out_block_len} 帧");
        Ok(Box::new(Self {
            block_len,
            out_block_len,
            state: [ImaState::default(); 2],
        }))
    }

    fn decode_block(&mut self, block: &[u8], out: &mut Vec<i16>) -> ReelResult<()> {
        let mut br = Cursor::new(block);
        let _type_id = br.read_u8()?;
        let _version = br.read_u8()?;
        let _sample_rate = br.read_u32::<LittleEndian>()?;
        let samples = br.read_u32::<LittleEndian>()? as usize;
        let sum_pred = br.read_i16::<LittleEndian>()?;
        let diff_pred = br.read_i16::<LittleEndian>()?;
        let sum_step = br.read_u8()?;
        let diff_step = br.read_u8()?;
        if sum_step > IMA_MAX_STEP || diff_step > IMA_MAX_STEP {
            return Err(ReelError::InvalidData("DK3 步长索引越界".into()));
        }
        if samples > self.out_block_len {
            return Err(ReelError::InvalidData(format!(
                "DK3 块样本数 {} 超过上限 {}",
                samples, self.out_block_len
            )));
        }
        self.state[0].reset(sum_pred, sum_step);
        self.state[1].reset(diff_pred, diff_step);

        let mut last_nib = 0u8;
        let mut diff_val = i32::from(diff_pred);
        let mut bytes = [0u8; 2];
        for x in (0..self.out_block_len).step_by(2) {
            let (nib0, nib1, nib2) = if x & 2 == 0 {
                if br.read_exact(&mut bytes).is_err() {
                    break;
                }
                last_nib = bytes[1] >> 4;
                (bytes[0] & 0xF, bytes[0] >> 4, bytes[1] & 0xF)
            } else {
                let Ok(b0) = br.read_u8() else {
                    break;
                };
                (last_nib, b0 & 0xF, b0 >> 4)
            };
            let sum0 = i32::from(self.state[0].expand_sample(nib0));
            let diff = i32::from(self.state[1].expand_sample(nib1));
            let sum1 = i32::from(self.state[0].expand_sample(nib2));
            diff_val = (diff_val + diff) >> 1;
            out.push((sum0 + diff_val) as i16);
            out.push((sum0 - diff_val) as i16);
            diff_val = (diff_val + diff) >> 1;
            out.push((sum1 + diff_val) as i16);
            out.push((sum1 - diff_val) as i16);
            diff_val = diff;
        }
        Ok(())
    }
}

impl PacketDecoder for Dk3AdpcmDecoder {
    fn name(&self) -> &str {
        "adpcm_dk3"
    }

    fn decode(&mut self, data: &[u8], out: &mut Vec<i16>) -> ReelResult<()> {
        for block in data.chunks_exact(self.block_len) {
            self.decode_block(block, out)?;
        }
        Ok(())
    }
}
