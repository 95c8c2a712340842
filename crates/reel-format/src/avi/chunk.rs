//! RIFF 块标签.
//!
//! `movi` 中的媒体块标签为 `NNxy`: `NN` 是两位十六进制流编号, `xy` 是块类型.

/// RIFF 文件头
pub const TAG_RIFF: [u8; 4] = *b"RIFF";
/// AVI 形式类型
pub const TAG_AVI: [u8; 4] = *b"AVI ";
/// LIST 块
pub const TAG_LIST: [u8; 4] = *b"LIST";
/// 头部列表
pub const TAG_HDRL: [u8; 4] = *b"hdrl";
/// 主头
pub const TAG_AVIH: [u8; 4] = *b"avih";
/// 流列表
pub const TAG_STRL: [u8; 4] = *b"strl";
/// 流头
pub const TAG_STRH: [u8; 4] = *b"strh";
/// 流格式
pub const TAG_STRF: [u8; 4] = *b"strf";
/// 媒体数据列表
pub const TAG_MOVI: [u8; 4] = *b"movi";
/// AVI 1.0 索引
pub const TAG_IDX1: [u8; 4] = *b"idx1";
/// 填充块
pub const TAG_JUNK: [u8; 4] = *b"JUNK";
/// 交错记录列表
pub const TAG_REC: [u8; 4] = *b"rec ";

/// 视频流类型
pub const STREAM_VIDS: [u8; 4] = *b"vids";
/// 音频流类型
pub const STREAM_AUDS: [u8; 4] = *b"auds";
/// MIDI 流类型
pub const STREAM_MIDS: [u8; 4] = *b"mids";
/// 文本流类型
pub const STREAM_TXTS: [u8; 4] = *b"txts";

/// 媒体块类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// 视频帧 ("dc" 压缩 / "db" 未压缩)
    VideoFrame,
    /// 音频块 ("wb")
    Audio,
    /// 调色板变更 ("pc")
    PaletteChange,
    /// 其他类型
    Other,
}

/// 按标签后两字节判断块类型
pub fn chunk_kind(tag: &[u8; 4]) -> ChunkKind {
    match &tag[2..4] {
        b"dc" | b"db" => ChunkKind::VideoFrame,
        b"wb" => ChunkKind::Audio,
        b"pc" => ChunkKind::PaletteChange,
        _ => ChunkKind::Other,
    }
}

/// 解析标签前两字节的十六进制流编号
pub fn stream_index(tag: &[u8; 4]) -> Option<u32> {
    let hi = (tag[0] as char).to_digit(16)?;
    let lo = (tag[1] as char).to_digit(16)?;
    Some(hi * 16 + lo)
}

/// 按流编号与块类型构造标签
pub fn make_tag(stream: u32, kind: &[u8; 2]) -> [u8; 4] {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    [
        HEX[((stream >> 4) & 0xF) as usize],
        HEX[(stream & 0xF) as usize],
        kind[0],
        kind[1],
    ]
}

/// 块负载按字 (2 字节) 对齐后的长度
pub const fn padded(size: u32) -> u64 {
    size as u64 + (size & 1) as u64
}
