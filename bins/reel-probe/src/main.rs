//! reel-probe - AVI 结构探测与无头回放工具
//!
//! 打印 AVI 的主头、各流头与索引统计, 然后可选地定位并解码若干帧,
//! 报告每帧的帧号、显示时间、画面 CRC-32 与已缓冲的音频时长.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Serialize;

use reel::logging::{self, LoggingConfig};
use reel_codec::{CodecRegistry, fourcc_to_string};
use reel_core::{MediaType, Rational, Timestamp, crc::crc32};
use reel_format::avi::index::stream_stats;
use reel_format::{
    AviDemuxer, IoContext, ManualClock, MediaContainer, NullMixer, VideoDecoder,
    VideoDecoderConfig,
};

/// Reel AVI 探测工具
#[derive(Parser, Debug)]
#[command(name = "reel-probe", version, about = "AVI 结构探测与无头回放工具")]
struct Cli {
    /// 输入文件路径
    input: PathBuf,

    /// 覆盖视频帧率 (NUM/DEN 或 NUM)
    #[arg(long, value_name = "NUM/DEN")]
    fps: Option<Rational>,

    /// 解码前定位到的时间 (秒)
    #[arg(long, value_name = "SECONDS")]
    seek: Option<f64>,

    /// 解码的帧数
    #[arg(long, default_value_t = 0)]
    frames: usize,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 日志详细程度 (-v: debug, -vv: 项目 trace, -vvv: 全局 trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ============================================================
// 输出结构体
// ============================================================

/// 完整探测结果
#[derive(Serialize)]
struct ProbeOutput {
    filename: String,
    main_header: MainHeaderInfo,
    streams: Vec<StreamInfo>,
    index: IndexInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    frames: Vec<FrameInfo>,
}

/// avih 信息
#[derive(Serialize)]
struct MainHeaderInfo {
    micro_sec_per_frame: u32,
    flags: u32,
    total_frames: u32,
    streams: u32,
    width: u32,
    height: u32,
}

/// 流信息
#[derive(Serialize)]
struct StreamInfo {
    index: u32,
    codec_type: String,
    handler: String,
    rate: u32,
    scale: u32,
    length: u32,
    sample_size: u32,
    // 视频字段
    #[serde(skip_serializing_if = "Option::is_none")]
    compression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bit_count: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_count: Option<u32>,
    // 音频字段
    #[serde(skip_serializing_if = "Option::is_none")]
    format_tag: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channels: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bits_per_sample: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    silent: Option<bool>,
    // 索引统计
    index_entries: usize,
    keyframes: usize,
    palette_changes: usize,
    total_bytes: u64,
}

/// 索引信息
#[derive(Serialize)]
struct IndexInfo {
    entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    absolute: Option<bool>,
    movi_start: u64,
    movi_end: u64,
}

/// 解码帧信息
#[derive(Serialize)]
struct FrameInfo {
    index: i64,
    time_ms: i64,
    width: u32,
    height: u32,
    crc32: String,
    audio_buffered_ms: u64,
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    let cli = Cli::parse();

    let logging_config = LoggingConfig {
        level: logging::verbosity_directives(cli.verbose),
        file_prefix: "reel-probe".to_string(),
        ..LoggingConfig::default()
    };
    if let Err(err) = logging::init(&logging_config) {
        eprintln!("初始化日志失败: {err:#}");
    }

    if let Err(err) = run(&cli) {
        eprintln!("错误: {err:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let registry = Arc::new(reel::default_codec_registry());
    let config = VideoDecoderConfig {
        frame_rate_override: cli.fps,
        ..VideoDecoderConfig::default()
    };

    let mut output = probe(&cli.input, &registry, &config)?;
    if cli.frames > 0 {
        output.frames = decode_frames(cli, registry, &config)?;
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text(&output);
    }
    Ok(())
}

/// 解析文件结构
fn probe(
    path: &Path,
    registry: &Arc<CodecRegistry>,
    config: &VideoDecoderConfig,
) -> Result<ProbeOutput> {
    let io = IoContext::open_read(path)
        .with_context(|| format!("打开文件失败: {}", path.display()))?;
    let mut demuxer = AviDemuxer::new(registry.clone(), config);
    demuxer
        .load(io)
        .with_context(|| format!("解析 AVI 失败: {}", path.display()))?;

    let header = demuxer.main_header();
    let main_header = MainHeaderInfo {
        micro_sec_per_frame: header.micro_sec_per_frame,
        flags: header.flags.bits(),
        total_frames: header.total_frames,
        streams: header.streams,
        width: header.width,
        height: header.height,
    };

    let mut streams = Vec::new();
    if let (Some(stream), Some(track)) = (demuxer.video_stream_index(), demuxer.video_track()) {
        let stats = stream_stats(demuxer.index(), stream);
        let strh = track.header();
        let bitmap = track.bitmap_info();
        streams.push(StreamInfo {
            index: stream,
            codec_type: MediaType::Video.to_string(),
            handler: fourcc_to_string(&strh.handler),
            rate: strh.rate,
            scale: strh.scale,
            length: strh.length,
            sample_size: strh.sample_size,
            compression: Some(fourcc_to_string(&bitmap.compression)),
            width: Some(track.width()),
            height: Some(track.height()),
            bit_count: Some(bitmap.bit_count),
            frame_count: Some(track.frame_count()),
            format_tag: None,
            sample_rate: None,
            channels: None,
            bits_per_sample: None,
            silent: None,
            index_entries: stats.entries,
            keyframes: stats.keyframes,
            palette_changes: stats.palette_changes,
            total_bytes: stats.total_bytes,
        });
    }
    for i in 0..demuxer.audio_track_count() {
        let (Some(stream), Some(track)) = (demuxer.audio_stream_index(i), demuxer.audio_track(i))
        else {
            continue;
        };
        let stats = stream_stats(demuxer.index(), stream);
        let strh = track.header();
        let wave = track.wave_format();
        streams.push(StreamInfo {
            index: stream,
            codec_type: MediaType::Audio.to_string(),
            handler: fourcc_to_string(&strh.handler),
            rate: strh.rate,
            scale: strh.scale,
            length: strh.length,
            sample_size: strh.sample_size,
            compression: None,
            width: None,
            height: None,
            bit_count: None,
            frame_count: None,
            format_tag: Some(wave.tag),
            sample_rate: Some(wave.samples_per_sec),
            channels: Some(wave.channels),
            bits_per_sample: Some(wave.bits_per_sample),
            silent: Some(track.is_null()),
            index_entries: stats.entries,
            keyframes: stats.keyframes,
            palette_changes: stats.palette_changes,
            total_bytes: stats.total_bytes,
        });
    }

    let (movi_start, movi_end) = demuxer.movi_range();
    let index = IndexInfo {
        entries: demuxer.index().len(),
        absolute: demuxer.index_is_absolute(),
        movi_start,
        movi_end,
    };

    Ok(ProbeOutput {
        filename: path.display().to_string(),
        main_header,
        streams,
        index,
        frames: Vec::new(),
    })
}

/// 无头驱动调度器解码若干帧
fn decode_frames(
    cli: &Cli,
    registry: Arc<CodecRegistry>,
    config: &VideoDecoderConfig,
) -> Result<Vec<FrameInfo>> {
    let mut decoder = VideoDecoder::avi(
        config,
        registry,
        Box::new(ManualClock::new()),
        Box::new(NullMixer::new()),
    );
    decoder
        .load_file(&cli.input)
        .with_context(|| format!("加载失败: {}", cli.input.display()))?;

    if let Some(seconds) = cli.seek {
        let target = Timestamp::from_millis((seconds * 1000.0).round() as i64);
        decoder
            .seek(target)
            .with_context(|| format!("定位到 {target} 失败"))?;
        info!("已定位到 {target}, 当前帧 {}", decoder.get_current_frame());
    }

    let mut frames = Vec::new();
    while frames.len() < cli.frames && !decoder.end_of_video() {
        let Some((width, height, crc)) = decoder
            .decode_next_frame()
            .map(|surface| (surface.width, surface.height, crc32(&surface.data)))
        else {
            continue;
        };
        let index = decoder.get_current_frame();
        let time_ms = Timestamp::from_frames(index, decoder.frame_rate()).to_millis();
        let audio_buffered_ms = (0..decoder.audio_track_count())
            .filter_map(|i| decoder.get_audio_track(i))
            .map(|track| track.buffered_millis())
            .sum();
        frames.push(FrameInfo {
            index,
            time_ms,
            width,
            height,
            crc32: format!("{crc:08x}"),
            audio_buffered_ms,
        });
    }
    Ok(frames)
}

fn print_text(output: &ProbeOutput) {
    let h = &output.main_header;
    println!("文件: {}", output.filename);
    println!(
        "主头: {}x{}, {} 帧, {} 个流, 每帧 {} us, 标志 0x{:08X}",
        h.width, h.height, h.total_frames, h.streams, h.micro_sec_per_frame, h.flags
    );
    for s in &output.streams {
        print!(
            "流 #{}: {} handler='{}' rate={}/{} length={} sample_size={}",
            s.index, s.codec_type, s.handler, s.rate, s.scale, s.length, s.sample_size
        );
        if let (Some(c), Some(w), Some(hh)) = (&s.compression, s.width, s.height) {
            print!(" 编码='{c}' {w}x{hh}");
        }
        if let (Some(tag), Some(rate), Some(ch)) = (s.format_tag, s.sample_rate, s.channels) {
            print!(" 格式=0x{tag:04X} {rate} Hz {ch} 声道");
            if s.silent == Some(true) {
                print!(" (静音)");
            }
        }
        println!();
        println!(
            "    索引: {} 条, {} 关键帧, {} 调色板变更, {} 字节",
            s.index_entries, s.keyframes, s.palette_changes, s.total_bytes
        );
    }
    let kind = match output.index.absolute {
        Some(true) => "绝对偏移",
        Some(false) => "相对偏移",
        None => "无索引",
    };
    println!(
        "索引: {} 条 ({}), movi=[{}, {})",
        output.index.entries, kind, output.index.movi_start, output.index.movi_end
    );
    for f in &output.frames {
        println!(
            "帧 {:>6} @ {:>8} ms  {}x{}  crc32={}  音频缓冲 {} ms",
            f.index, f.time_ms, f.width, f.height, f.crc32, f.audio_buffered_ms
        );
    }
}
