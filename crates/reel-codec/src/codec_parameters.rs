//! 编解码器参数.
//!
//! 描述从容器中提取的编解码器配置, 由容器填充后交给注册表创建实例.

use bytes::Bytes;

/// 视频编解码器参数 (对应 BITMAPINFOHEADER)
#[derive(Debug, Clone)]
pub struct VideoCodecParams {
    /// 压缩 fourcc, 未压缩位图为 `[0, 0, 0, 0]`
    pub fourcc: [u8; 4],
    /// 流头中的 handler fourcc
    pub handler: [u8; 4],
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素), 负值表示自上而下存储
    pub height: i32,
    /// 每像素位数
    pub bit_count: u16,
    /// strf 中 BITMAPINFOHEADER 之后的附加数据 (不含调色板)
    pub extra_data: Bytes,
}

impl VideoCodecParams {
    /// 画面高度的绝对值
    pub fn abs_height(&self) -> u32 {
        self.height.unsigned_abs()
    }
}

/// 音频编解码器参数 (对应 WAVEFORMATEX)
#[derive(Debug, Clone)]
pub struct AudioCodecParams {
    /// 格式标签
    pub format_tag: u16,
    /// 声道数
    pub channels: u16,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 平均字节率
    pub avg_bytes_per_sec: u32,
    /// 块对齐 (ADPCM 为每块字节数)
    pub block_align: u16,
    /// 每样本位数
    pub bits_per_sample: u16,
    /// cbSize 之后的附加数据
    pub extra_data: Bytes,
}
