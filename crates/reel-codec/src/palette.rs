//! 256 色调色板.

/// 调色板条目数
pub const PALETTE_SIZE: usize = 256;

/// 256 项 RGB 调色板
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [[u8; 3]; PALETTE_SIZE],
}

impl Palette {
    /// 创建全黑调色板
    pub const fn new() -> Self {
        Self {
            entries: [[0; 3]; PALETTE_SIZE],
        }
    }

    /// 从 BGRX 排列的字节读取前 `count` 项 (AVI strf 中的 RGBQUAD 表)
    ///
    /// 数据不足时只读取完整的项, 其余保持黑色.
    pub fn from_bgrx(data: &[u8], count: usize) -> Self {
        let mut palette = Self::new();
        for (i, quad) in data.chunks_exact(4).take(count.min(PALETTE_SIZE)).enumerate() {
            palette.entries[i] = [quad[2], quad[1], quad[0]];
        }
        palette
    }

    /// 读取一项 (R, G, B)
    pub fn get(&self, index: u8) -> [u8; 3] {
        self.entries[usize::from(index)]
    }

    /// 设置一项 (R, G, B)
    pub fn set(&mut self, index: u8, rgb: [u8; 3]) {
        self.entries[usize::from(index)] = rgb;
    }

    /// 以 RGB 三元组切片形式访问
    pub fn entries(&self) -> &[[u8; 3]; PALETTE_SIZE] {
        &self.entries
    }

    /// 按 R, G, B 顺序展开为 768 字节
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.entries.iter().flatten().copied().collect()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}
