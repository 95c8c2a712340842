//! 未压缩位图解码器 (BI_RGB).
//!
//! 每帧是一张完整的 DIB: 行按 4 字节对齐, 正高度时自下而上存储.
//! 输出统一为自上而下、行紧密排列的画面.

use log::debug;
use reel_core::{PixelFormat, ReelError, ReelResult};

use crate::codec_parameters::VideoCodecParams;
use crate::surface::Surface;
use crate::video_codec::VideoCodec;

/// 未压缩位图解码器
pub struct RawBitmapCodec {
    /// 图像宽度
    width: u32,
    /// 图像高度 (绝对值)
    height: u32,
    /// 码流中行是否自下而上存储
    bottom_up: bool,
    /// 输出像素格式
    pixel_format: PixelFormat,
    /// 预计算: 码流中每行字节数 (含对齐填充)
    src_stride: usize,
}

impl RawBitmapCodec {
    pub fn create(params: &VideoCodecParams) -> ReelResult<Box<dyn VideoCodec>> {
        let pixel_format = match params.bit_count {
            8 => PixelFormat::Pal8,
            16 => PixelFormat::Rgb555le,
            24 => PixelFormat::Bgr24,
            32 => PixelFormat::Bgra,
            other => {
                return Err(ReelError::Unsupported(format!(
                    "未压缩位图不支持 {other} 位像素"
                )));
            }
        };
        if params.width == 0 || params.height == 0 {
            return Err(ReelError::InvalidArgument("宽度和高度不能为 0".into()));
        }

        let row_bytes = params.width as usize * pixel_format.bytes_per_pixel();
        let src_stride = (row_bytes + 3) & !3;
        debug!(
            "打开未压缩位图解码器: {}x{}, 格式={}, 行跨度={}",
            params.width,
            params.abs_height(),
            pixel_format,
            src_stride,
        );
        Ok(Box::new(Self {
            width: params.width,
            height: params.abs_height(),
            bottom_up: params.height > 0,
            pixel_format,
            src_stride,
        }))
    }
}

impl VideoCodec for RawBitmapCodec {
    fn name(&self) -> &str {
        "rawbitmap"
    }

    fn decode_frame(&mut self, data: &[u8]) -> ReelResult<Option<Surface>> {
        let expected = self.src_stride * self.height as usize;
        if data.len() < expected {
            return Err(ReelError::InvalidData(format!(
                "位图帧数据不足: 需要 {} 字节, 实际 {} 字节",
                expected,
                data.len(),
            )));
        }

        let mut surface = Surface::new(self.width, self.height, self.pixel_format);
        for y in 0..self.height {
            let src_row = if self.bottom_up {
                self.height - 1 - y
            } else {
                y
            };
            let start = src_row as usize * self.src_stride;
            let dst = surface.row_mut(y);
            let len = dst.len();
            dst.copy_from_slice(&data[start..start + len]);
        }
        Ok(Some(surface))
    }

    fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }
}
