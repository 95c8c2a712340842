//! AVI 头部结构: avih、strh、strf (BITMAPINFOHEADER / WAVEFORMATEX).
//!
//! 所有解析函数作用于已读入内存的块负载, 负载不足时返回错误而不是越界.

use std::io::{Cursor, Read};

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt};
use bytes::Bytes;
use reel_codec::{AudioCodecParams, Palette, VideoCodecParams};
use reel_core::{Rational, ReelError, ReelResult};

bitflags! {
    /// avih 标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MainHeaderFlags: u32 {
        /// 文件带有 idx1 索引
        const HAS_INDEX = 0x0000_0010;
        /// 必须按索引顺序播放
        const MUST_USE_INDEX = 0x0000_0020;
        /// 音视频交错存储
        const IS_INTERLEAVED = 0x0000_0100;
        /// 索引中的关键帧标志可信
        const TRUST_CK_TYPE = 0x0000_0800;
        /// 采集文件
        const WAS_CAPTURE_FILE = 0x0001_0000;
        /// 含版权数据
        const COPYRIGHTED = 0x0002_0000;
    }
}

/// avih 主头
#[derive(Debug, Clone, Default)]
pub struct MainHeader {
    /// 每帧微秒数
    pub micro_sec_per_frame: u32,
    /// 最大字节率
    pub max_bytes_per_sec: u32,
    /// 填充粒度
    pub padding_granularity: u32,
    /// 标志
    pub flags: MainHeaderFlags,
    /// 总帧数
    pub total_frames: u32,
    /// 交错文件的初始帧数
    pub initial_frames: u32,
    /// 流数量
    pub streams: u32,
    /// 建议缓冲区大小
    pub buffer_size: u32,
    /// 宽度
    pub width: u32,
    /// 高度
    pub height: u32,
}

/// 解析 avih 负载 (至少 40 字节, 保留字段忽略)
pub fn parse_main_header(data: &[u8]) -> ReelResult<MainHeader> {
    if data.len() < 40 {
        return Err(ReelError::Format(format!("avih 长度不足: {}", data.len())));
    }
    let mut r = Cursor::new(data);
    Ok(MainHeader {
        micro_sec_per_frame: r.read_u32::<LittleEndian>()?,
        max_bytes_per_sec: r.read_u32::<LittleEndian>()?,
        padding_granularity: r.read_u32::<LittleEndian>()?,
        flags: MainHeaderFlags::from_bits_retain(r.read_u32::<LittleEndian>()?),
        total_frames: r.read_u32::<LittleEndian>()?,
        initial_frames: r.read_u32::<LittleEndian>()?,
        streams: r.read_u32::<LittleEndian>()?,
        buffer_size: r.read_u32::<LittleEndian>()?,
        width: r.read_u32::<LittleEndian>()?,
        height: r.read_u32::<LittleEndian>()?,
    })
}

/// 流头中的目标矩形
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameRect {
    pub left: i16,
    pub top: i16,
    pub right: i16,
    pub bottom: i16,
}

/// strh 流头
#[derive(Debug, Clone, Default)]
pub struct StreamHeader {
    /// 流类型 (vids / auds / mids / txts)
    pub stream_type: [u8; 4],
    /// 处理器 fourcc
    pub handler: [u8; 4],
    /// 标志
    pub flags: u32,
    /// 优先级
    pub priority: u16,
    /// 语言
    pub language: u16,
    /// 初始帧数
    pub initial_frames: u32,
    /// 时间刻度
    pub scale: u32,
    /// 速率 (rate / scale = 每秒单位数)
    pub rate: u32,
    /// 起始时间
    pub start: u32,
    /// 长度 (单位数)
    pub length: u32,
    /// 建议缓冲区大小
    pub buffer_size: u32,
    /// 质量
    pub quality: u32,
    /// 样本大小, 0 表示可变码率
    pub sample_size: u32,
    /// 目标矩形 (旧文件可能缺失)
    pub frame: FrameRect,
}

impl StreamHeader {
    /// 流的名义速率 (rate / scale)
    pub fn unit_rate(&self) -> Rational {
        Rational::from_rate_scale(self.rate, self.scale)
    }

    /// 是否为可变码率 (每块前进一个单位)
    pub fn is_variable_bitrate(&self) -> bool {
        self.sample_size == 0
    }
}

/// 解析 strh 负载 (至少 48 字节)
pub fn parse_stream_header(data: &[u8]) -> ReelResult<StreamHeader> {
    if data.len() < 48 {
        return Err(ReelError::Format(format!("strh 长度不足: {}", data.len())));
    }
    let mut r = Cursor::new(data);
    let mut stream_type = [0u8; 4];
    r.read_exact(&mut stream_type)?;
    let mut handler = [0u8; 4];
    r.read_exact(&mut handler)?;
    let mut header = StreamHeader {
        stream_type,
        handler,
        flags: r.read_u32::<LittleEndian>()?,
        priority: r.read_u16::<LittleEndian>()?,
        language: r.read_u16::<LittleEndian>()?,
        initial_frames: r.read_u32::<LittleEndian>()?,
        scale: r.read_u32::<LittleEndian>()?,
        rate: r.read_u32::<LittleEndian>()?,
        start: r.read_u32::<LittleEndian>()?,
        length: r.read_u32::<LittleEndian>()?,
        buffer_size: r.read_u32::<LittleEndian>()?,
        quality: r.read_u32::<LittleEndian>()?,
        sample_size: r.read_u32::<LittleEndian>()?,
        frame: FrameRect::default(),
    };
    if data.len() >= 56 {
        header.frame = FrameRect {
            left: r.read_i16::<LittleEndian>()?,
            top: r.read_i16::<LittleEndian>()?,
            right: r.read_i16::<LittleEndian>()?,
            bottom: r.read_i16::<LittleEndian>()?,
        };
    }
    Ok(header)
}

/// strf 中的 BITMAPINFOHEADER
#[derive(Debug, Clone)]
pub struct BitmapInfoHeader {
    /// 结构大小
    pub size: u32,
    /// 宽度
    pub width: u32,
    /// 高度 (负值表示自上而下)
    pub height: i32,
    /// 平面数
    pub planes: u16,
    /// 每像素位数
    pub bit_count: u16,
    /// 压缩 fourcc, BI_RGB 为全零
    pub compression: [u8; 4],
    /// 图像字节数
    pub size_image: u32,
    /// 水平分辨率
    pub x_pels_per_meter: u32,
    /// 垂直分辨率
    pub y_pels_per_meter: u32,
    /// 使用的颜色数, 0 表示 256 (仅对 8 位有意义)
    pub clr_used: u32,
    /// 重要颜色数
    pub clr_important: u32,
    /// 8 位视频的初始调色板
    pub palette: Option<Palette>,
    /// 调色板之后的编解码器附加数据
    pub extra_data: Bytes,
}

impl BitmapInfoHeader {
    /// 构造编解码器参数
    pub fn codec_params(&self, handler: [u8; 4]) -> VideoCodecParams {
        VideoCodecParams {
            fourcc: self.compression,
            handler,
            width: self.width,
            height: self.height,
            bit_count: self.bit_count,
            extra_data: self.extra_data.clone(),
        }
    }
}

/// 解析 strf 中的 BITMAPINFOHEADER (至少 40 字节)
pub fn parse_bitmap_info(data: &[u8]) -> ReelResult<BitmapInfoHeader> {
    if data.len() < 40 {
        return Err(ReelError::Format(format!(
            "BITMAPINFOHEADER 长度不足: {}",
            data.len()
        )));
    }
    let mut r = Cursor::new(data);
    let size = r.read_u32::<LittleEndian>()?;
    let width = r.read_u32::<LittleEndian>()?;
    let height = r.read_i32::<LittleEndian>()?;
    let planes = r.read_u16::<LittleEndian>()?;
    let bit_count = r.read_u16::<LittleEndian>()?;
    let mut compression = [0u8; 4];
    r.read_exact(&mut compression)?;
    let size_image = r.read_u32::<LittleEndian>()?;
    let x_pels_per_meter = r.read_u32::<LittleEndian>()?;
    let y_pels_per_meter = r.read_u32::<LittleEndian>()?;
    let clr_used = r.read_u32::<LittleEndian>()?;
    let clr_important = r.read_u32::<LittleEndian>()?;

    let mut rest = &data[40..];
    let palette = if bit_count == 8 {
        let count = (if clr_used == 0 { 256 } else { clr_used.min(256) }) as usize;
        let table_len = (count * 4).min(rest.len());
        let palette = Palette::from_bgrx(&rest[..table_len], count);
        rest = &rest[table_len..];
        Some(palette)
    } else {
        None
    };

    Ok(BitmapInfoHeader {
        size,
        width,
        height,
        planes,
        bit_count,
        compression,
        size_image,
        x_pels_per_meter,
        y_pels_per_meter,
        clr_used,
        clr_important,
        palette,
        extra_data: Bytes::copy_from_slice(rest),
    })
}

/// strf 中的 WAVEFORMATEX
#[derive(Debug, Clone)]
pub struct WaveFormat {
    /// 格式标签
    pub tag: u16,
    /// 声道数
    pub channels: u16,
    /// 采样率
    pub samples_per_sec: u32,
    /// 平均字节率
    pub avg_bytes_per_sec: u32,
    /// 块对齐
    pub block_align: u16,
    /// 每样本位数 (旧的 WAVEFORMAT 缺省为 8)
    pub bits_per_sample: u16,
    /// 附加数据
    pub extra_data: Bytes,
}

impl WaveFormat {
    /// 构造编解码器参数
    pub fn codec_params(&self) -> AudioCodecParams {
        AudioCodecParams {
            format_tag: self.tag,
            channels: self.channels,
            sample_rate: self.samples_per_sec,
            avg_bytes_per_sec: self.avg_bytes_per_sec,
            block_align: self.block_align,
            bits_per_sample: self.bits_per_sample,
            extra_data: self.extra_data.clone(),
        }
    }
}

/// 解析 strf 中的 WAVEFORMAT / WAVEFORMATEX (至少 14 字节)
pub fn parse_wave_format(data: &[u8]) -> ReelResult<WaveFormat> {
    if data.len() < 14 {
        return Err(ReelError::Format(format!(
            "WAVEFORMAT 长度不足: {}",
            data.len()
        )));
    }
    let mut r = Cursor::new(data);
    let tag = r.read_u16::<LittleEndian>()?;
    let channels = r.read_u16::<LittleEndian>()?;
    let samples_per_sec = r.read_u32::<LittleEndian>()?;
    let avg_bytes_per_sec = r.read_u32::<LittleEndian>()?;
    let block_align = r.read_u16::<LittleEndian>()?;
    let bits_per_sample = if data.len() >= 16 {
        r.read_u16::<LittleEndian>()?
    } else {
        8
    };
    let extra_data = if data.len() >= 18 {
        let cb_size = usize::from(r.read_u16::<LittleEndian>()?);
        let available = data.len() - 18;
        Bytes::copy_from_slice(&data[18..18 + cb_size.min(available)])
    } else {
        Bytes::new()
    };

    Ok(WaveFormat {
        tag,
        channels,
        samples_per_sec,
        avg_bytes_per_sec,
        block_align,
        bits_per_sample,
        extra_data,
    })
}
