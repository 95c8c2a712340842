//! AVI 1.0 索引 (idx1).
//!
//! 加载时规范化: 相对偏移改写为绝对偏移, 缺少关键帧标志的流全部视为关键帧.
//! 规范化之后索引不再修改.

use std::collections::HashSet;
use std::io::{Cursor, Read};

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use reel_core::ReelResult;

use super::chunk::{self, ChunkKind};

bitflags! {
    /// 索引条目标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct IndexFlags: u32 {
        /// 条目指向 LIST 块
        const LIST = 0x0000_0001;
        /// 关键帧
        const KEYFRAME = 0x0000_0010;
        /// 不计入时间
        const NO_TIME = 0x0000_0100;
    }
}

/// 单条索引条目大小
pub const INDEX_ENTRY_SIZE: usize = 16;

/// 索引条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// 块标签
    pub tag: [u8; 4],
    /// 标志
    pub flags: IndexFlags,
    /// 块头在文件中的绝对偏移 (负载从 offset + 8 开始)
    pub offset: u64,
    /// 负载大小
    pub size: u32,
}

impl IndexEntry {
    /// 是否带关键帧标志
    pub fn is_keyframe(&self) -> bool {
        self.flags.contains(IndexFlags::KEYFRAME)
    }

    /// 所属流编号
    pub fn stream_index(&self) -> Option<u32> {
        chunk::stream_index(&self.tag)
    }

    /// 块类型
    pub fn kind(&self) -> ChunkKind {
        chunk::chunk_kind(&self.tag)
    }

    /// 是否为 rec 列表标记
    pub fn is_list_marker(&self) -> bool {
        self.tag == chunk::TAG_REC || self.flags.contains(IndexFlags::LIST)
    }

    /// 负载在文件中的偏移
    pub fn data_offset(&self) -> u64 {
        self.offset + 8
    }
}

/// 解析 idx1 负载并规范化
///
/// 若首条目偏移等于 `movi_start` (紧跟 'movi' 四字节之后的位置) 则视为绝对偏移,
/// 否则所有偏移加上 `movi_start - 4`.
pub fn parse_index(data: &[u8], movi_start: u64) -> ReelResult<Vec<IndexEntry>> {
    let count = data.len() / INDEX_ENTRY_SIZE;
    let mut entries = Vec::with_capacity(count);
    let mut r = Cursor::new(data);
    for _ in 0..count {
        let mut tag = [0u8; 4];
        r.read_exact(&mut tag)?;
        let flags = IndexFlags::from_bits_retain(r.read_u32::<LittleEndian>()?);
        let offset = u64::from(r.read_u32::<LittleEndian>()?);
        let size = r.read_u32::<LittleEndian>()?;
        entries.push(IndexEntry {
            tag,
            flags,
            offset,
            size,
        });
    }

    let Some(first) = entries.first() else {
        debug!("idx1 为空");
        return Ok(entries);
    };

    if first.offset == movi_start {
        debug!("idx1 使用绝对偏移, {} 个条目", entries.len());
    } else {
        let base = movi_start.saturating_sub(4);
        debug!("idx1 使用相对偏移 (基址 {base}), {} 个条目", entries.len());
        for entry in &mut entries {
            entry.offset += base;
        }
    }

    apply_keyframe_fallback(&mut entries);
    Ok(entries)
}

/// 某个流的所有条目都没有关键帧标志时, 全部标为关键帧
fn apply_keyframe_fallback(entries: &mut [IndexEntry]) {
    let mut seen = HashSet::new();
    let mut keyed = HashSet::new();
    for entry in entries.iter() {
        if let Some(stream) = entry.stream_index() {
            seen.insert(stream);
            if entry.is_keyframe() {
                keyed.insert(stream);
            }
        }
    }

    for stream in seen.difference(&keyed) {
        debug!("流 {stream} 的索引没有关键帧标志, 全部视为关键帧");
    }
    for entry in entries.iter_mut() {
        if let Some(stream) = entry.stream_index() {
            if !keyed.contains(&stream) {
                entry.flags |= IndexFlags::KEYFRAME;
            }
        }
    }
}

/// 按流统计的索引信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// 条目数
    pub entries: usize,
    /// 关键帧数 (不含调色板变更)
    pub keyframes: usize,
    /// 调色板变更数
    pub palette_changes: usize,
    /// 负载总字节数
    pub total_bytes: u64,
}

/// 统计指定流的索引信息
pub fn stream_stats(entries: &[IndexEntry], stream: u32) -> IndexStats {
    let mut stats = IndexStats::default();
    for entry in entries.iter().filter(|e| e.stream_index() == Some(stream)) {
        stats.entries += 1;
        stats.total_bytes += u64::from(entry.size);
        if entry.kind() == ChunkKind::PaletteChange {
            stats.palette_changes += 1;
        } else if entry.is_keyframe() {
            stats.keyframes += 1;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_entry(tag: &[u8; 4], flags: u32, offset: u32, size: u32) -> Vec<u8> {
        let mut v = tag.to_vec();
        v.extend_from_slice(&flags.to_le_bytes());
        v.extend_from_slice(&offset.to_le_bytes());
        v.extend_from_slice(&size.to_le_bytes());
        v
    }

    #[test]
    fn test_索引_相对偏移改写() {
        // movi_start = 1000, 相对偏移以 'movi' 标签位置 (996) 为基址
        let mut data = raw_entry(b"00dc", 0x10, 4, 100);
        data.extend(raw_entry(b"00dc", 0, 112, 50));
        let entries = parse_index(&data, 1000).unwrap();
        assert_eq!(entries[0].offset, 1000);
        assert_eq!(entries[1].offset, 1108);
        assert_eq!(entries[0].data_offset(), 1008);
    }

    #[test]
    fn test_索引_绝对偏移保持() {
        let mut data = raw_entry(b"00dc", 0x10, 1000, 100);
        data.extend(raw_entry(b"00dc", 0, 1108, 50));
        let entries = parse_index(&data, 1000).unwrap();
        assert_eq!(entries[0].offset, 1000);
        assert_eq!(entries[1].offset, 1108);
    }

    #[test]
    fn test_索引_关键帧回退() {
        let mut data = raw_entry(b"00dc", 0x10, 4, 10);
        data.extend(raw_entry(b"01wb", 0, 22, 10));
        data.extend(raw_entry(b"00dc", 0, 40, 10));
        data.extend(raw_entry(b"01wb", 0, 58, 10));
        let entries = parse_index(&data, 500).unwrap();
        // 音频流没有关键帧标志: 全部标记
        assert!(entries[1].is_keyframe());
        assert!(entries[3].is_keyframe());
        // 视频流已有关键帧: 保持原样
        assert!(entries[0].is_keyframe());
        assert!(!entries[2].is_keyframe());
    }

    #[test]
    fn test_索引_尾部不完整条目被忽略() {
        let mut data = raw_entry(b"00dc", 0x10, 4, 10);
        data.extend_from_slice(&[1, 2, 3]);
        let entries = parse_index(&data, 100).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(parse_index(&[], 100).unwrap().is_empty());
    }

    #[test]
    fn test_索引_按流统计() {
        let mut data = raw_entry(b"00dc", 0x10, 4, 10);
        data.extend(raw_entry(b"00pc", 0, 22, 8));
        data.extend(raw_entry(b"00dc", 0, 38, 12));
        data.extend(raw_entry(b"01wb", 0x10, 58, 10));
        let entries = parse_index(&data, 500).unwrap();
        let stats = stream_stats(&entries, 0);
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.keyframes, 1);
        assert_eq!(stats.palette_changes, 1);
        assert_eq!(stats.total_bytes, 30);
    }
}
