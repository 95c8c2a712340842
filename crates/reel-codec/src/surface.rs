//! 解码画面.
//!
//! 打包格式的单平面图像, 行与行之间可以有填充 (pitch >= width * bpp).

use reel_core::PixelFormat;

/// 解码后的画面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
    /// 每行字节数
    pub pitch: usize,
    /// 像素格式
    pub pixel_format: PixelFormat,
    /// 像素数据, 长度为 pitch * height
    pub data: Vec<u8>,
}

impl Surface {
    /// 创建填零的画面, 行紧密排列
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        let pitch = width as usize * pixel_format.bytes_per_pixel();
        Self {
            width,
            height,
            pitch,
            pixel_format,
            data: vec![0; pitch * height as usize],
        }
    }

    /// 获取第 y 行的像素字节 (不含行尾填充)
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.pitch;
        let len = self.width as usize * self.pixel_format.bytes_per_pixel();
        &self.data[start..start + len]
    }

    /// 获取第 y 行的可变像素字节
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.pitch;
        let len = self.width as usize * self.pixel_format.bytes_per_pixel();
        &mut self.data[start..start + len]
    }

    /// 清零全部像素
    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_画面_行访问() {
        let mut s = Surface::new(3, 2, PixelFormat::Bgr24);
        assert_eq!(s.pitch, 9);
        assert_eq!(s.data.len(), 18);
        s.row_mut(1).copy_from_slice(&[1; 9]);
        assert_eq!(s.row(0), &[0; 9]);
        assert_eq!(s.row(1), &[1; 9]);
        s.clear();
        assert!(s.data.iter().all(|&b| b == 0));
    }
}
